//! RefundReversalHandler - `charge.refunded` and `charge.refund.updated`.
//!
//! A refund reverses the payment and ends the subscription it paid for.

use std::sync::Arc;

use super::cancellation_cascade::{CancellationCascade, CascadeReason};
use crate::domain::billing::{Payment, Subscription, REFUND_CANCELLATION_REASON};
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::{HandlerOutcome, RefundNotice, WebhookError};
use crate::ports::{PaymentRepository, SubscriptionRepository};

pub struct RefundReversalHandler {
    payments: Arc<dyn PaymentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    cascade: Arc<CancellationCascade>,
}

impl RefundReversalHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        cascade: Arc<CancellationCascade>,
    ) -> Self {
        Self {
            payments,
            subscriptions,
            cascade,
        }
    }

    pub async fn handle(&self, notice: &RefundNotice) -> Result<HandlerOutcome, WebhookError> {
        let Some(payment) = self.find_payment(notice).await? else {
            tracing::warn!(
                invoice_id = ?notice.invoice_id,
                payment_intent_id = ?notice.payment_intent_id,
                charge_id = ?notice.charge_id,
                "Refund for unknown payment"
            );
            return Ok(HandlerOutcome::skipped("no payment matches refund"));
        };

        let now = Timestamp::now();
        let refunded_cents = if notice.amount_refunded_cents > 0 {
            notice.amount_refunded_cents
        } else {
            payment.amount_cents
        };
        self.payments
            .mark_refunded(&payment.id, refunded_cents, now)
            .await?;
        tracing::info!(
            payment_id = %payment.id,
            refunded_cents,
            "Payment marked refunded"
        );

        let Some(mut subscription) = self.find_subscription(&payment, notice).await? else {
            return Ok(HandlerOutcome::applied(format!(
                "payment {} refunded; no subscription found",
                payment.id
            )));
        };

        if subscription.is_terminal() {
            tracing::warn!(
                subscription_id = %subscription.external_id,
                status = %subscription.status,
                "Refund on a subscription already ended; cancelling again"
            );
        }
        subscription.force_cancel(REFUND_CANCELLATION_REASON, now);
        let stored = self.subscriptions.upsert(&subscription).await?;

        self.cascade.deactivate_link(&stored).await?;
        self.cascade
            .notify(
                &stored,
                CascadeReason::Refunded {
                    amount_cents: refunded_cents,
                    currency: payment.currency.clone(),
                },
            )
            .await;

        Ok(HandlerOutcome::applied(format!(
            "payment {} refunded; subscription {} canceled",
            payment.id, stored.external_id
        )))
    }

    /// Invoice id first, then payment intent, then charge.
    async fn find_payment(&self, notice: &RefundNotice) -> Result<Option<Payment>, WebhookError> {
        if let Some(invoice_id) = notice.invoice_id.as_deref() {
            if let Some(payment) = self.payments.find_by_invoice_id(invoice_id).await? {
                return Ok(Some(payment));
            }
        }
        if let Some(intent_id) = notice.payment_intent_id.as_deref() {
            if let Some(payment) = self.payments.find_by_payment_intent_id(intent_id).await? {
                return Ok(Some(payment));
            }
        }
        if let Some(charge_id) = notice.charge_id.as_deref() {
            return Ok(self.payments.find_by_charge_id(charge_id).await?);
        }
        Ok(None)
    }

    async fn find_subscription(
        &self,
        payment: &Payment,
        notice: &RefundNotice,
    ) -> Result<Option<Subscription>, WebhookError> {
        if let Some(id) = payment.subscription_id {
            if let Some(subscription) = self.subscriptions.find_by_id(&id).await? {
                return Ok(Some(subscription));
            }
        }
        let external = payment
            .external_subscription_id
            .as_deref()
            .or(notice.subscription_ref.as_deref());
        match external {
            Some(external_id) => Ok(self.subscriptions.find_by_external_id(external_id).await?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, RecordingNotificationSender};
    use crate::domain::billing::{
        test_subscription, Account, ChargeRefs, CoachStudentLink, FeeSchedule, PaymentStatus,
        SubscriptionStatus,
    };

    struct Fixture {
        store: InMemoryBillingStore,
        notifier: RecordingNotificationSender,
        handler: RefundReversalHandler,
        subscription: Subscription,
    }

    fn fixture(status: SubscriptionStatus) -> Fixture {
        let store = InMemoryBillingStore::new();
        let notifier = RecordingNotificationSender::new();
        let subscription = test_subscription("sub_1", status);
        store.put_account(Account::new_student(
            subscription.student_id,
            "e@x.com",
            None,
            None,
            subscription.coach_id,
            Timestamp::now(),
        ));
        store.put_link(CoachStudentLink::new_active(
            subscription.coach_id,
            subscription.student_id,
            Timestamp::now(),
        ));
        store.put_subscription(subscription.clone());

        let cascade = Arc::new(CancellationCascade::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
        ));
        let handler =
            RefundReversalHandler::new(Arc::new(store.clone()), Arc::new(store.clone()), cascade);
        Fixture {
            store,
            notifier,
            handler,
            subscription,
        }
    }

    fn record_payment(f: &Fixture, refs: ChargeRefs) -> Payment {
        let payment = Payment::succeeded(
            &f.subscription,
            refs,
            FeeSchedule::default().split(5000, None),
            "usd".to_string(),
            Timestamp::now(),
        );
        f.store.put_payment(payment.clone());
        payment
    }

    #[tokio::test]
    async fn refund_without_invoice_matches_by_payment_intent() {
        let f = fixture(SubscriptionStatus::Active);
        record_payment(
            &f,
            ChargeRefs {
                invoice_id: Some("in_1".to_string()),
                payment_intent_id: Some("pi_1".to_string()),
                charge_id: Some("ch_1".to_string()),
            },
        );

        let outcome = f
            .handler
            .handle(&RefundNotice {
                payment_intent_id: Some("pi_1".to_string()),
                amount_refunded_cents: 5000,
                ..RefundNotice::default()
            })
            .await
            .unwrap();

        assert!(outcome.is_applied());
        let payment = &f.store.payments()[0];
        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert_eq!(payment.refunded_amount_cents, 5000);

        let sub = f.store.subscription("sub_1").unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.cancellation_reason.as_deref(), Some(REFUND_CANCELLATION_REASON));
        assert!(sub.canceled_at.is_some());
        assert_eq!(sub.current_period_end, sub.canceled_at);

        assert!(!f
            .store
            .link(&f.subscription.coach_id, &f.subscription.student_id)
            .unwrap()
            .active);
        assert_eq!(f.notifier.count_of_kind("refund"), 1);
    }

    #[tokio::test]
    async fn falls_back_to_charge_id() {
        let f = fixture(SubscriptionStatus::Active);
        record_payment(
            &f,
            ChargeRefs {
                invoice_id: None,
                payment_intent_id: None,
                charge_id: Some("ch_9".to_string()),
            },
        );

        let outcome = f
            .handler
            .handle(&RefundNotice {
                payment_intent_id: Some("pi_unknown".to_string()),
                charge_id: Some("ch_9".to_string()),
                amount_refunded_cents: 2500,
                ..RefundNotice::default()
            })
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(f.store.payments()[0].refunded_amount_cents, 2500);
    }

    #[tokio::test]
    async fn unknown_payment_is_skipped() {
        let f = fixture(SubscriptionStatus::Active);

        let outcome = f
            .handler
            .handle(&RefundNotice {
                charge_id: Some("ch_x".to_string()),
                ..RefundNotice::default()
            })
            .await
            .unwrap();

        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
        assert_eq!(
            f.store.subscription("sub_1").unwrap().status,
            SubscriptionStatus::Active
        );
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn refund_on_canceled_subscription_still_cascades() {
        let f = fixture(SubscriptionStatus::Canceled);
        record_payment(
            &f,
            ChargeRefs {
                invoice_id: Some("in_1".to_string()),
                ..ChargeRefs::default()
            },
        );

        let outcome = f
            .handler
            .handle(&RefundNotice {
                invoice_id: Some("in_1".to_string()),
                amount_refunded_cents: 5000,
                ..RefundNotice::default()
            })
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(
            f.store.subscription("sub_1").unwrap().cancellation_reason.as_deref(),
            Some(REFUND_CANCELLATION_REASON)
        );
        assert_eq!(f.notifier.count_of_kind("refund"), 1);
    }
}
