//! Coach Billing - Stripe webhook reconciliation for coach and student billing.
//!
//! Verifies signed Stripe deliveries and folds them into local accounts,
//! subscriptions, payments and coach-student links, sending the matching
//! transactional emails along the way.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
