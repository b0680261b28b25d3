//! Payment configuration

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::FeeSchedule;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret. Deliveries answer 500 while unset.
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,

    #[serde(default = "default_api_base")]
    pub stripe_api_base: String,

    /// Platform cut when an invoice carries no application fee
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u32,

    #[serde(default = "default_processor_fee_bps")]
    pub processor_fee_bps: u32,

    #[serde(default = "default_processor_fee_fixed_cents")]
    pub processor_fee_fixed_cents: i64,

    /// Days a webhook ledger record is kept
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: u32,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_") || self.stripe_api_key.starts_with("rk_test_")
    }

    pub fn api_key(&self) -> SecretString {
        SecretString::new(self.stripe_api_key.clone())
    }

    /// The signing secret, treating a blank value as unset.
    pub fn webhook_secret(&self) -> Option<SecretString> {
        self.stripe_webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.to_string()))
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            platform_fee_bps: self.platform_fee_bps,
            processor_fee_bps: self.processor_fee_bps,
            processor_fee_fixed_cents: self.processor_fee_fixed_cents,
        }
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if !self.stripe_api_key.starts_with("sk_") && !self.stripe_api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if let Some(secret) = self.stripe_webhook_secret.as_deref().map(str::trim) {
            if !secret.is_empty() && !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }
        if !self.stripe_api_base.starts_with("http") {
            return Err(ValidationError::InvalidUrl("PAYMENT__STRIPE_API_BASE"));
        }
        for bps in [self.platform_fee_bps, self.processor_fee_bps] {
            if bps > 10_000 {
                return Err(ValidationError::InvalidFeeRate(bps));
            }
        }
        if self.webhook_retention_days == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        let fees = FeeSchedule::default();
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: None,
            stripe_api_base: default_api_base(),
            platform_fee_bps: fees.platform_fee_bps,
            processor_fee_bps: fees.processor_fee_bps,
            processor_fee_fixed_cents: fees.processor_fee_fixed_cents,
            webhook_retention_days: default_webhook_retention_days(),
        }
    }
}

fn default_api_base() -> String {
    crate::adapters::stripe::STRIPE_API_BASE.to_string()
}

fn default_platform_fee_bps() -> u32 {
    FeeSchedule::default().platform_fee_bps
}

fn default_processor_fee_bps() -> u32 {
    FeeSchedule::default().processor_fee_bps
}

fn default_processor_fee_fixed_cents() -> i64 {
    FeeSchedule::default().processor_fee_fixed_cents
}

fn default_webhook_retention_days() -> u32 {
    90
}
