//! EventRouter - dispatches a verified event to its handler.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::checkout_completed::CheckoutCompletedHandler;
use super::payment_ledger::PaymentLedgerHandler;
use super::refund_reversal::RefundReversalHandler;
use super::subscription_sync::SubscriptionSynchronizer;
use crate::domain::webhook::{
    HandlerOutcome, RefundNotice, StripeCharge, StripeCheckoutSession, StripeEvent,
    StripeEventType, StripeInvoice, StripeRefund, StripeSubscription, WebhookError,
};

pub struct EventRouter {
    checkout: Arc<CheckoutCompletedHandler>,
    subscriptions: Arc<SubscriptionSynchronizer>,
    payments: Arc<PaymentLedgerHandler>,
    refunds: Arc<RefundReversalHandler>,
}

impl EventRouter {
    pub fn new(
        checkout: Arc<CheckoutCompletedHandler>,
        subscriptions: Arc<SubscriptionSynchronizer>,
        payments: Arc<PaymentLedgerHandler>,
        refunds: Arc<RefundReversalHandler>,
    ) -> Self {
        Self {
            checkout,
            subscriptions,
            payments,
            refunds,
        }
    }

    pub async fn route(&self, event: &StripeEvent) -> Result<HandlerOutcome, WebhookError> {
        let event_type = event.parsed_type();
        match event_type {
            StripeEventType::CheckoutSessionCompleted => {
                let session: StripeCheckoutSession = match object(event) {
                    Ok(session) => session,
                    Err(outcome) => return Ok(outcome),
                };
                self.checkout.handle(&session).await
            }
            StripeEventType::CustomerSubscriptionCreated
            | StripeEventType::CustomerSubscriptionUpdated
            | StripeEventType::CustomerSubscriptionDeleted => {
                let subscription: StripeSubscription = match object(event) {
                    Ok(subscription) => subscription,
                    Err(outcome) => return Ok(outcome),
                };
                self.subscriptions.sync(&subscription).await
            }
            StripeEventType::InvoicePaymentSucceeded => {
                let invoice: StripeInvoice = match object(event) {
                    Ok(invoice) => invoice,
                    Err(outcome) => return Ok(outcome),
                };
                self.payments.on_payment_succeeded(&invoice).await
            }
            StripeEventType::InvoicePaymentFailed => {
                let invoice: StripeInvoice = match object(event) {
                    Ok(invoice) => invoice,
                    Err(outcome) => return Ok(outcome),
                };
                self.payments.on_payment_failed(&invoice).await
            }
            StripeEventType::ChargeRefunded => {
                let charge: StripeCharge = match object(event) {
                    Ok(charge) => charge,
                    Err(outcome) => return Ok(outcome),
                };
                self.refunds.handle(&RefundNotice::from(&charge)).await
            }
            StripeEventType::ChargeRefundUpdated => {
                let refund: StripeRefund = match object(event) {
                    Ok(refund) => refund,
                    Err(outcome) => return Ok(outcome),
                };
                if !refund.is_succeeded() {
                    return Ok(HandlerOutcome::skipped(format!(
                        "refund {} is {}",
                        refund.id,
                        refund.status.as_deref().unwrap_or("pending")
                    )));
                }
                self.refunds.handle(&RefundNotice::from(&refund)).await
            }
            StripeEventType::Unknown => Ok(HandlerOutcome::skipped("unhandled event type")),
        }
    }
}

/// Deserializes the event's data object. A payload that does not match its
/// declared type can never succeed on retry, so it becomes a Failed outcome.
fn object<T: DeserializeOwned>(event: &StripeEvent) -> Result<T, HandlerOutcome> {
    event.deserialize_object().map_err(|e| {
        tracing::error!(
            event_id = %event.id,
            event_type = %event.event_type,
            error = %e,
            "Malformed event payload"
        );
        HandlerOutcome::failed(format!("malformed {} payload: {}", event.event_type, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::webhook::{BillingPorts, WebhookHandlers};
    use crate::domain::billing::{test_subscription, SubscriptionStatus};
    use crate::domain::webhook::StripeEventBuilder;
    use serde_json::json;

    fn router() -> (crate::adapters::memory::InMemoryBillingStore, EventRouter) {
        let (ports, doubles) = BillingPorts::in_memory();
        let handlers = WebhookHandlers::build(ports, Default::default());
        (doubles.store, handlers.into_router())
    }

    #[tokio::test]
    async fn unknown_event_is_skipped_without_writes() {
        let (store, router) = router();
        let event = StripeEventBuilder::new("customer.created")
            .object(json!({"id": "cus_1"}))
            .build();

        let outcome = router.route(&event).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::skipped("unhandled event type"));
        assert!(store.accounts().is_empty());
        assert!(store.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_of_known_type_fails() {
        let (_, router) = router();
        let event = StripeEventBuilder::new("invoice.payment_succeeded")
            .object(json!({"amount_paid": "lots"}))
            .build();

        let outcome = router.route(&event).await.unwrap();

        assert!(outcome.is_failed());
        assert!(outcome.detail().starts_with("malformed invoice.payment_succeeded"));
    }

    #[tokio::test]
    async fn pending_refund_update_is_skipped() {
        let (store, router) = router();
        store.put_subscription(test_subscription("sub_1", SubscriptionStatus::Active));
        let event = StripeEventBuilder::new("charge.refund.updated")
            .object(json!({"id": "re_1", "amount": 5000, "charge": "ch_1", "status": "pending"}))
            .build();

        let outcome = router.route(&event).await.unwrap();

        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
        assert_eq!(
            store.subscription("sub_1").unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn subscription_deleted_routes_to_synchronizer() {
        let (store, router) = router();
        let sub = test_subscription("sub_1", SubscriptionStatus::Active);
        store.put_subscription(sub);
        let event = StripeEventBuilder::new("customer.subscription.deleted")
            .object(json!({"id": "sub_1", "status": "canceled"}))
            .build();

        let outcome = router.route(&event).await.unwrap();

        assert!(outcome.is_applied());
        assert_eq!(
            store.subscription("sub_1").unwrap().status,
            SubscriptionStatus::Canceled
        );
    }
}
