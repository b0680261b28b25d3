//! Stripe REST client.
//!
//! Implements the `PaymentProcessor` port. Requests are form-encoded with
//! the secret key as the basic-auth user, as Stripe expects.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::webhook::StripeSubscription;
use crate::ports::{PaymentError, PaymentErrorCode, PaymentProcessor, UpdateSubscriptionRequest};

/// Default Stripe API endpoint.
pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: STRIPE_API_BASE.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

pub struct StripeClient {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Form fields for a subscription update.
///
/// Metadata keys merge into what Stripe already holds.
fn update_form(request: &UpdateSubscriptionRequest) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = request
        .metadata
        .iter()
        .map(|(key, value)| (format!("metadata[{}]", key), value.clone()))
        .collect();
    form.sort();
    if let Some(destination) = &request.transfer_destination {
        form.push(("transfer_data[destination]".to_string(), destination.clone()));
    }
    form
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn error_from_response(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let code = match status.as_u16() {
        400 | 402 => PaymentErrorCode::InvalidRequest,
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        _ => PaymentErrorCode::ProviderError,
    };
    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| format!("Stripe API error ({})", status));
            let error = PaymentError::new(code, message);
            match parsed.error.code {
                Some(provider_code) => error.with_provider_code(provider_code),
                None => error,
            }
        }
        Err(_) => PaymentError::new(code, format!("Stripe API error ({}): {}", status, body)),
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn update_subscription(
        &self,
        request: UpdateSubscriptionRequest,
    ) -> Result<StripeSubscription, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, request.subscription_id
        );

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&update_form(&request))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                subscription_id = %request.subscription_id,
                status = %status,
                "Stripe subscription update rejected"
            );
            return Err(error_from_response(status, &body));
        }

        response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn form_carries_metadata_and_destination() {
        let mut metadata = HashMap::new();
        metadata.insert("coach_id".to_string(), "c1".to_string());
        metadata.insert("student_id".to_string(), "s1".to_string());
        let request = UpdateSubscriptionRequest {
            subscription_id: "sub_1".to_string(),
            metadata,
            transfer_destination: Some("acct_1".to_string()),
        };

        let form = update_form(&request);

        assert_eq!(
            form,
            vec![
                ("metadata[coach_id]".to_string(), "c1".to_string()),
                ("metadata[student_id]".to_string(), "s1".to_string()),
                ("transfer_data[destination]".to_string(), "acct_1".to_string()),
            ]
        );
    }

    #[test]
    fn stripe_error_body_maps_code_and_message() {
        let body = r#"{"error": {"type": "invalid_request_error", "code": "resource_missing", "message": "No such subscription: 'sub_x'"}}"#;

        let error = error_from_response(reqwest::StatusCode::NOT_FOUND, body);

        assert_eq!(error.code, PaymentErrorCode::NotFound);
        assert_eq!(error.provider_code.as_deref(), Some("resource_missing"));
        assert!(error.message.contains("sub_x"));
        assert!(!error.retryable);
    }

    #[test]
    fn rate_limit_is_retryable_even_without_json() {
        let error = error_from_response(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(error.code, PaymentErrorCode::RateLimitExceeded);
        assert!(error.retryable);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = StripeConfig::new(SecretString::new("sk_test".to_string()))
            .with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }
}
