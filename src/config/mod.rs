//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `COACH_BILLING` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use coach_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod email;
mod error;
mod identity;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use identity::IdentityConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    /// Email configuration (Resend)
    pub email: EmailConfig,

    /// Identity provisioning (auth server admin API)
    pub identity: IdentityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `COACH_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `COACH_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `COACH_BILLING__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COACH_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// The Stripe webhook secret is not required. Without it every delivery
    /// answers 500 and Stripe keeps retrying.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.email.validate()?;
        self.identity.validate(self.is_production())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("COACH_BILLING__DATABASE__URL", "postgresql://test@localhost/test"),
        ("COACH_BILLING__PAYMENT__STRIPE_API_KEY", "sk_test_xxx"),
        ("COACH_BILLING__EMAIL__RESEND_API_KEY", "re_xxx"),
        ("COACH_BILLING__IDENTITY__ADMIN_URL", "http://localhost:9999"),
        ("COACH_BILLING__IDENTITY__SERVICE_KEY", "service-role"),
    ];

    const OPTIONAL: &[&str] = &[
        "COACH_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET",
        "COACH_BILLING__PAYMENT__PLATFORM_FEE_BPS",
        "COACH_BILLING__SERVER__PORT",
        "COACH_BILLING__SERVER__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.server.port, 8080);
        assert!(config.payment.stripe_webhook_secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_webhook_secret_and_fees_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("COACH_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_live");
        env::set_var("COACH_BILLING__PAYMENT__PLATFORM_FEE_BPS", "1500");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.payment.webhook_secret().is_some());
        assert_eq!(config.payment.fee_schedule().platform_fee_bps, 1500);
    }

    #[test]
    fn test_missing_stripe_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("COACH_BILLING__PAYMENT__STRIPE_API_KEY", "");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("COACH_BILLING__SERVER__ENVIRONMENT", "production");
        env::set_var("COACH_BILLING__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(config.server.port, 3000);
        // plain-http admin URL is rejected in production
        assert!(config.validate().is_err());
    }
}
