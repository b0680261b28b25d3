//! Axum router for the webhook service.

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers::{handle_stripe_webhook, health, WebhookAppState};

/// Creates the router.
///
/// # Routes
/// - `POST /api/webhooks/stripe` - Stripe event deliveries (signature verified)
/// - `GET /health` - Liveness, outside the middleware
///
/// No timeout layer: a delivery runs to completion once accepted.
pub fn webhook_router(state: WebhookAppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let webhooks = Router::new().route("/api/webhooks/stripe", post(handle_stripe_webhook));
    let health_routes = Router::new().route("/health", get(health));

    webhooks
        .layer(middleware)
        .merge(health_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{BillingPorts, WebhookHandlers};
    use crate::domain::billing::{test_subscription, SubscriptionStatus};
    use crate::domain::webhook::generate_test_header;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "whsec_routes_test";

    fn app(secret: Option<&str>) -> (crate::adapters::memory::InMemoryBillingStore, Router) {
        let (ports, doubles) = BillingPorts::in_memory();
        let service = WebhookHandlers::build(ports, Default::default())
            .into_service(secret.map(|s| SecretString::new(s.to_string())));
        let state = WebhookAppState::new(Arc::new(service));
        (doubles.store, webhook_router(state))
    }

    fn delivery(payload: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        builder.body(Body::from(payload.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn failed_invoice_payload() -> String {
        json!({
            "id": "evt_route_1",
            "type": "invoice.payment_failed",
            "created": chrono::Utc::now().timestamp(),
            "livemode": false,
            "data": {"object": {"id": "in_1", "subscription": "sub_1", "attempt_count": 1}}
        })
        .to_string()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (_, app) = app(Some(SECRET));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn signed_delivery_is_acknowledged() {
        let (store, app) = app(Some(SECRET));
        store.put_subscription(test_subscription("sub_1", SubscriptionStatus::Active));
        let payload = failed_invoice_payload();
        let header = generate_test_header(SECRET, chrono::Utc::now().timestamp(), &payload);

        let response = app.oneshot(delivery(&payload, Some(header))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["received"], json!(true));
        assert_eq!(body["outcome"], json!("applied"));
        assert_eq!(body["event_id"], json!("evt_route_1"));
    }

    #[tokio::test]
    async fn missing_signature_header_is_bad_request() {
        let (store, app) = app(Some(SECRET));

        let response = app
            .oneshot(delivery(&failed_invoice_payload(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error_code"], json!("MISSING_SIGNATURE"));
        assert_eq!(store.webhook_record_count(), 0);
    }

    #[tokio::test]
    async fn unconfigured_secret_is_server_error() {
        let (_, app) = app(None);
        let payload = failed_invoice_payload();
        let header = generate_test_header(SECRET, chrono::Utc::now().timestamp(), &payload);

        let response = app.oneshot(delivery(&payload, Some(header))).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (_, app) = app(Some(SECRET));

        let response = app
            .oneshot(delivery(&failed_invoice_payload(), None))
            .await
            .unwrap();

        assert!(response.headers().contains_key("x-request-id"));
    }
}
