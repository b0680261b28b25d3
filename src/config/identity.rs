//! Identity provider configuration

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;

/// Auth server admin API used to provision student identities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Admin base URL, e.g. `https://auth.example.com/auth/v1`
    pub admin_url: String,

    /// Service role key for the admin API
    pub service_key: String,

    /// Landing page for activation links
    #[serde(default)]
    pub activation_redirect_url: Option<String>,
}

impl IdentityConfig {
    pub fn service_key(&self) -> SecretString {
        SecretString::new(self.service_key.clone())
    }

    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.admin_url.is_empty() {
            return Err(ValidationError::MissingRequired("IDENTITY__ADMIN_URL"));
        }
        if self.service_key.is_empty() {
            return Err(ValidationError::MissingRequired("IDENTITY__SERVICE_KEY"));
        }
        let scheme_ok = if production {
            self.admin_url.starts_with("https://")
        } else {
            self.admin_url.starts_with("http://") || self.admin_url.starts_with("https://")
        };
        if !scheme_ok {
            return Err(ValidationError::InvalidUrl("IDENTITY__ADMIN_URL"));
        }
        if let Some(redirect) = &self.activation_redirect_url {
            if !redirect.starts_with("http") {
                return Err(ValidationError::InvalidUrl("IDENTITY__ACTIVATION_REDIRECT_URL"));
            }
        }
        Ok(())
    }
}
