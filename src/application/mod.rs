//! Application layer - event handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    BillingPorts, InMemoryDoubles, ProcessResult, WebhookAck, WebhookHandlers, WebhookProcessor,
    WebhookService,
};
