//! In-memory adapters.
//!
//! Deterministic implementations of every port, shared by unit tests,
//! the `tests/` integration suite, and database-less local runs.

mod billing_store;
mod in_memory_provisioner;
mod mock_payment_processor;
mod recording_notifier;

pub use billing_store::InMemoryBillingStore;
pub use in_memory_provisioner::InMemoryAccountProvisioner;
pub use mock_payment_processor::MockPaymentProcessor;
pub use recording_notifier::RecordingNotificationSender;
