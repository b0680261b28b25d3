//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the reconciliation engine and the outside world. Adapters implement
//! these ports.
//!
//! ## Persisted State Store
//!
//! - `AccountRepository`, `InvitationRepository`, `SubscriptionRepository`,
//!   `PaymentRepository`, `CoachStudentLinkRepository`
//! - `WebhookEventRepository` - ledger of processed Stripe webhooks
//!
//! ## Collaborators
//!
//! - `PaymentProcessor` - Stripe REST API
//! - `NotificationSender` - transactional email
//! - `AccountProvisioner` - authentication identities

mod account_provisioner;
mod account_repository;
mod insert_result;
mod invitation_repository;
mod link_repository;
mod notification_sender;
mod payment_processor;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use account_provisioner::{AccountProvisioner, Identity, NewIdentity};
pub use account_repository::AccountRepository;
pub use insert_result::InsertResult;
pub use invitation_repository::InvitationRepository;
pub use link_repository::CoachStudentLinkRepository;
pub use notification_sender::{format_amount, Notification, NotificationSender};
pub use payment_processor::{
    PaymentError, PaymentErrorCode, PaymentProcessor, UpdateSubscriptionRequest,
};
pub use payment_repository::PaymentRepository;
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_repository::{LedgerStatus, WebhookEventRecord, WebhookEventRepository};
