//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the reconciliation engine to external systems:
//! - `email` - Resend transactional email
//! - `http` - axum webhook endpoint
//! - `identity` - GoTrue admin API account provisioning
//! - `memory` - In-memory doubles for every port
//! - `postgres` - sqlx repositories
//! - `stripe` - Stripe REST API client

pub mod email;
pub mod http;
pub mod identity;
pub mod memory;
pub mod postgres;
pub mod stripe;
