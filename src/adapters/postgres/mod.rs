//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! One repository per table, all sharing a `PgPool`. Natural-key inserts
//! use `ON CONFLICT` so redelivered webhooks never create duplicates.

mod account_repository;
mod invitation_repository;
mod link_repository;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use account_repository::PostgresAccountRepository;
pub use invitation_repository::PostgresInvitationRepository;
pub use link_repository::PostgresLinkRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use crate::domain::foundation::DomainError;

fn database_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}
