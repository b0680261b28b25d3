//! Application handlers.
//!
//! Orchestrate domain operations over the ports.

pub mod webhook;

pub use webhook::{
    BillingPorts, InMemoryDoubles, ProcessResult, WebhookAck, WebhookHandlers, WebhookProcessor,
    WebhookService,
};
