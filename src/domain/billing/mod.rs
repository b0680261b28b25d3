//! Billing domain - accounts, invitations, subscriptions and payments
//! as seen by the reconciliation engine.

mod account;
mod fees;
mod invitation;
mod link;
mod metadata;
mod payment;
mod subscription;

pub use account::{normalize_email, Account, Role};
pub use fees::{FeeSchedule, FeeSplit};
pub use invitation::{ConsumeOutcome, Invitation, InvitationStatus};
pub use link::CoachStudentLink;
pub use metadata::{keys as metadata_keys, BillingMetadata, ParsedMetadata, METADATA_VERSION};
pub use payment::{ChargeRefs, Payment, PaymentStatus};
pub use subscription::{Subscription, SubscriptionStatus, REFUND_CANCELLATION_REASON};

#[cfg(test)]
pub(crate) use subscription::test_subscription;
