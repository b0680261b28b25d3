//! Webhook error types for Stripe webhook handling.
//!
//! Only transport, authentication and infrastructure failures are errors.
//! Business-level problems inside a handler are reported through
//! [`HandlerOutcome`](super::HandlerOutcome) and still acknowledged.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Request carried no Stripe-Signature header.
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    /// No webhook signing secret is configured.
    #[error("Webhook signing secret is not configured")]
    MissingSecret,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the tolerance window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the signature header or the event envelope.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Persisted state store failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Processing task ended without producing a result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Returns true if Stripe should retry delivering this webhook.
    ///
    /// A missing secret is retryable: redeliveries succeed once the
    /// deployment is fixed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::Internal(_) | WebhookError::MissingSecret
        )
    }

    /// Maps the error to an HTTP status code.
    ///
    /// - 4xx: rejected request, no handler ran
    /// - 5xx: Stripe retries with backoff
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            WebhookError::MissingSecret | WebhookError::Database(_) | WebhookError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Repository failures escape handlers as retryable errors.
impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Error Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(format!("{}", WebhookError::InvalidSignature), "Invalid signature");
    }

    #[test]
    fn parse_error_displays_message() {
        let err = WebhookError::ParseError("invalid JSON".to_string());
        assert_eq!(format!("{}", err), "Parse error: invalid JSON");
    }

    #[test]
    fn domain_error_converts_to_database_error() {
        let err: WebhookError = DomainError::database("pool timed out").into();
        assert!(matches!(err, WebhookError::Database(ref msg) if msg.contains("pool timed out")));
    }

    // ══════════════════════════════════════════════════════════════
    // Retryability Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn database_error_is_retryable() {
        assert!(WebhookError::Database("connection failed".to_string()).is_retryable());
    }

    #[test]
    fn internal_error_is_retryable_server_error() {
        let err = WebhookError::Internal("task panicked".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_secret_is_retryable() {
        assert!(WebhookError::MissingSecret.is_retryable());
    }

    #[test]
    fn authentication_failures_are_not_retryable() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
            WebhookError::ParseError("bad".to_string()),
        ] {
            assert!(!err.is_retryable(), "{} should not be retryable", err);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn signature_failures_return_bad_request() {
        assert_eq!(WebhookError::MissingSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WebhookError::InvalidSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WebhookError::TimestampOutOfRange.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WebhookError::InvalidTimestamp.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_error_returns_bad_request() {
        let err = WebhookError::ParseError("syntax error".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_secret_returns_internal_error() {
        assert_eq!(
            WebhookError::MissingSecret.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_error_returns_internal_error() {
        let err = WebhookError::Database("connection lost".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
