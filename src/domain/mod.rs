//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Accounts, invitations, subscriptions, payments and fees
//! - `webhook` - Stripe event envelope, payload objects and signature verification

pub mod billing;
pub mod foundation;
pub mod webhook;
