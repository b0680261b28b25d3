//! HTTP adapter for Stripe webhook delivery.
//!
//! - `POST /api/webhooks/stripe` - Verify, process and acknowledge one event
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, HealthResponse};
pub use handlers::{WebhookApiError, WebhookAppState, STRIPE_SIGNATURE_HEADER};
pub use routes::webhook_router;
