//! Webhook domain - Stripe event envelope, payload objects, signature
//! verification and handler outcomes.

mod outcome;
mod stripe_event;
mod stripe_objects;
mod webhook_errors;
mod webhook_verifier;

pub use outcome::HandlerOutcome;
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use stripe_objects::{
    RefundNotice, StripeCancellationDetails, StripeCharge, StripeCheckoutSession,
    StripeCustomerDetails, StripeInvoice, StripeInvoiceStatusTransitions, StripeList, StripePrice,
    StripePriceRecurring, StripeRefund, StripeSubscription, StripeSubscriptionItem,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{generate_test_header, SignatureHeader, StripeWebhookVerifier};

#[cfg(test)]
pub(crate) use stripe_event::StripeEventBuilder;
