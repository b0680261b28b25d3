//! HTTP handlers for the Stripe webhook endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::dto::{ErrorResponse, HealthResponse};
use crate::application::WebhookService;
use crate::domain::webhook::WebhookError;

/// Header Stripe signs every delivery with.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct WebhookAppState {
    pub service: Arc<WebhookService>,
}

impl WebhookAppState {
    pub fn new(service: Arc<WebhookService>) -> Self {
        Self { service }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe
///
/// The body is taken as raw bytes; the signature covers them exactly.
/// Processing runs on its own task so a dropped connection cannot cancel a
/// handler halfway through.
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let service = Arc::clone(&state.service);
    let ack = tokio::spawn(async move { service.handle(&body, signature.as_deref()).await })
        .await
        .map_err(|e| WebhookError::Internal(format!("webhook task aborted: {}", e)))??;

    Ok((StatusCode::OK, Json(ack)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Wrapper so `WebhookError` can be returned from handlers.
#[derive(Debug)]
pub struct WebhookApiError(pub WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Webhook rejected for retry");
        } else {
            tracing::warn!(error = %self.0, "Webhook rejected");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_maps_to_server_error() {
        let response = WebhookApiError(WebhookError::MissingSecret).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_signature_maps_to_bad_request() {
        let response = WebhookApiError(WebhookError::MissingSignature).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
