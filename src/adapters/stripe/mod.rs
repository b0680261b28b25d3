//! Stripe API adapter.
//!
//! Implements the `PaymentProcessor` port over Stripe's REST API. Webhook
//! verification lives in the domain (`domain::webhook`) since it needs no
//! network access.
//!
//! # Security
//!
//! - The secret API key is held as `secrecy::SecretString`
//! - Requests authenticate with HTTP basic auth over TLS

mod stripe_client;

pub use stripe_client::{StripeClient, StripeConfig, STRIPE_API_BASE};
