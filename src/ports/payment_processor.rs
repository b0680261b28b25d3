//! Payment processor port - outbound calls to Stripe.
//!
//! Only the subscription update made during checkout completion is needed.
//! Everything else reaches this service as webhooks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::webhook::StripeSubscription;

/// Port for the payment processor's REST API.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Writes metadata (and optionally a payout destination) onto a
    /// subscription. Returns the subscription as the processor now sees it.
    async fn update_subscription(
        &self,
        request: UpdateSubscriptionRequest,
    ) -> Result<StripeSubscription, PaymentError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSubscriptionRequest {
    /// Stripe subscription id (`sub_...`).
    pub subscription_id: String,
    pub metadata: HashMap<String, String>,
    /// Connected account receiving the transfer for each invoice.
    pub transfer_destination: Option<String>,
}

/// Errors from payment processor operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            PaymentErrorCode::InvalidRequest => ErrorCode::ValidationFailed,
            _ => ErrorCode::ExternalServiceError,
        };
        DomainError::new(code, err.message).with_detail("service", "stripe")
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Request rejected as malformed.
    InvalidRequest,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retryable() {
        assert!(PaymentError::network("reset").retryable);
        assert!(!PaymentError::not_found("subscription").retryable);
    }

    #[test]
    fn converts_to_external_service_domain_error() {
        let err: DomainError = PaymentError::network("timeout").into();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
        assert!(!err.is_infrastructure());
    }

    #[test]
    fn display_includes_code() {
        let err = PaymentError::not_found("subscription");
        assert_eq!(err.to_string(), "not_found: subscription not found");
    }
}
