//! Response bodies for the webhook endpoint.

use serde::Serialize;

use crate::domain::webhook::WebhookError;

/// Error body for rejected deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether Stripe is expected to redeliver.
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl From<&WebhookError> for ErrorResponse {
    fn from(err: &WebhookError) -> Self {
        let code = match err {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::MissingSecret => "WEBHOOK_SECRET_NOT_CONFIGURED",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                "INVALID_TIMESTAMP"
            }
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::Database(_) | WebhookError::Internal(_) => "INTERNAL_ERROR",
        };
        // Infrastructure detail stays in the logs.
        let message = match err {
            WebhookError::Database(_) | WebhookError::Internal(_) => {
                "Internal error; retry later".to_string()
            }
            other => other.to_string(),
        };
        ErrorResponse::new(code, message).retryable(err.is_retryable())
    }
}

/// Liveness body for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_hide_detail() {
        let body = ErrorResponse::from(&WebhookError::Database("connection refused".into()));
        assert_eq!(body.error_code, "INTERNAL_ERROR");
        assert!(!body.message.contains("connection refused"));
        assert!(body.retryable);
    }

    #[test]
    fn signature_errors_are_not_retryable() {
        let body = ErrorResponse::from(&WebhookError::InvalidSignature);
        assert_eq!(body.error_code, "INVALID_SIGNATURE");
        assert!(!body.retryable);
    }

    #[test]
    fn health_serializes_status() {
        let json = serde_json::to_value(HealthResponse::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }
}
