//! PaymentLedgerHandler - invoice payment outcomes.
//!
//! `invoice.payment_succeeded` records a Payment (once per invoice id) and
//! confirms it by email. `invoice.payment_failed` flags the subscription
//! past due.

use std::sync::Arc;

use crate::domain::billing::{ChargeRefs, FeeSchedule, Payment};
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::{HandlerOutcome, StripeInvoice, WebhookError};
use crate::ports::{
    AccountRepository, InsertResult, Notification, NotificationSender, PaymentRepository,
    SubscriptionRepository,
};

pub struct PaymentLedgerHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    accounts: Arc<dyn AccountRepository>,
    notifier: Arc<dyn NotificationSender>,
    fees: FeeSchedule,
}

impl PaymentLedgerHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        accounts: Arc<dyn AccountRepository>,
        notifier: Arc<dyn NotificationSender>,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            accounts,
            notifier,
            fees,
        }
    }

    pub async fn on_payment_succeeded(
        &self,
        invoice: &StripeInvoice,
    ) -> Result<HandlerOutcome, WebhookError> {
        let Some(external_id) = invoice.subscription.as_deref() else {
            return Ok(HandlerOutcome::skipped(format!(
                "invoice {} has no subscription",
                invoice.id
            )));
        };
        let Some(subscription) = self.subscriptions.find_by_external_id(external_id).await? else {
            tracing::warn!(
                invoice_id = %invoice.id,
                subscription_id = external_id,
                "Payment for unknown subscription not recorded"
            );
            return Ok(HandlerOutcome::skipped(format!(
                "no local subscription {} for invoice {}",
                external_id, invoice.id
            )));
        };
        // A $0 invoice (trial, full discount) moves no money: no payment row
        // and no receipt.
        if invoice.amount_paid <= 0 {
            tracing::info!(invoice_id = %invoice.id, "Zero-amount invoice not recorded");
            return Ok(HandlerOutcome::skipped(format!(
                "invoice {} has no amount paid",
                invoice.id
            )));
        }

        let split = self
            .fees
            .split(invoice.amount_paid, invoice.application_fee_amount);
        let paid_at = Timestamp::from_unix_opt(invoice.paid_at()).unwrap_or_else(Timestamp::now);
        let currency = if invoice.currency.is_empty() {
            subscription.currency.clone()
        } else {
            invoice.currency.clone()
        };
        let payment = Payment::succeeded(
            &subscription,
            ChargeRefs {
                invoice_id: Some(invoice.id.clone()),
                payment_intent_id: invoice.payment_intent.clone(),
                charge_id: invoice.charge.clone(),
            },
            split,
            currency,
            paid_at,
        );

        if self.payments.insert_if_absent(&payment).await? == InsertResult::AlreadyExists {
            tracing::info!(invoice_id = %invoice.id, "Payment already recorded");
            return Ok(HandlerOutcome::skipped(format!(
                "payment for invoice {} already recorded",
                invoice.id
            )));
        }

        tracing::info!(
            invoice_id = %invoice.id,
            subscription_id = %subscription.external_id,
            amount_cents = split.amount_cents,
            platform_fee_cents = split.platform_fee_cents,
            coach_amount_cents = split.coach_amount_cents,
            "Payment recorded"
        );

        self.send_confirmation(&payment).await;

        Ok(HandlerOutcome::applied(format!(
            "payment recorded for invoice {}",
            invoice.id
        )))
    }

    pub async fn on_payment_failed(
        &self,
        invoice: &StripeInvoice,
    ) -> Result<HandlerOutcome, WebhookError> {
        let Some(external_id) = invoice.subscription.as_deref() else {
            return Ok(HandlerOutcome::skipped(format!(
                "invoice {} has no subscription",
                invoice.id
            )));
        };
        let Some(mut subscription) = self.subscriptions.find_by_external_id(external_id).await?
        else {
            return Ok(HandlerOutcome::skipped(format!(
                "no local subscription {} for invoice {}",
                external_id, invoice.id
            )));
        };
        // A late failure must not pull a finished subscription out of its
        // terminal status.
        if subscription.is_terminal() {
            return Ok(HandlerOutcome::skipped(format!(
                "subscription {} already {}",
                external_id, subscription.status
            )));
        }

        subscription.mark_past_due(Timestamp::now());
        self.subscriptions.upsert(&subscription).await?;

        tracing::warn!(
            invoice_id = %invoice.id,
            subscription_id = external_id,
            attempt_count = invoice.attempt_count,
            "Invoice payment failed; subscription past due"
        );

        Ok(HandlerOutcome::applied(format!(
            "subscription {} marked past_due",
            external_id
        )))
    }

    async fn send_confirmation(&self, payment: &Payment) {
        let student = match self.accounts.find_by_id(&payment.student_id).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                tracing::warn!(student_id = %payment.student_id, "No student account for payment confirmation");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load student for payment confirmation");
                return;
            }
        };

        let notification = Notification::PaymentConfirmation {
            to: student.email,
            student_name: student.full_name,
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            invoice_id: payment.invoice_id.clone(),
        };
        if let Err(e) = self.notifier.send(notification).await {
            tracing::error!(
                invoice_id = ?payment.invoice_id,
                error = %e,
                "Failed to send payment confirmation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, RecordingNotificationSender};
    use crate::domain::billing::{test_subscription, Account, SubscriptionStatus};
    use serde_json::json;

    struct Fixture {
        store: InMemoryBillingStore,
        notifier: RecordingNotificationSender,
        handler: PaymentLedgerHandler,
    }

    fn fixture(status: SubscriptionStatus) -> Fixture {
        let store = InMemoryBillingStore::new();
        let notifier = RecordingNotificationSender::new();
        let sub = test_subscription("sub_1", status);
        store.put_account(Account::new_student(
            sub.student_id,
            "s@x.com",
            None,
            None,
            sub.coach_id,
            Timestamp::now(),
        ));
        store.put_subscription(sub);
        let handler = PaymentLedgerHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
            FeeSchedule::default(),
        );
        Fixture {
            store,
            notifier,
            handler,
        }
    }

    fn invoice(subscription: Option<&str>, fee: Option<i64>) -> StripeInvoice {
        serde_json::from_value(json!({
            "id": "in_1",
            "subscription": subscription,
            "amount_paid": 5000,
            "currency": "usd",
            "application_fee_amount": fee,
            "payment_intent": "pi_1",
            "charge": "ch_1",
            "attempt_count": 1
        }))
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Payment succeeded
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn records_payment_with_fee_split_and_confirms() {
        let f = fixture(SubscriptionStatus::Active);

        let outcome = f
            .handler
            .on_payment_succeeded(&invoice(Some("sub_1"), Some(800)))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        let payments = f.store.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].platform_fee_cents, 800);
        assert_eq!(payments[0].coach_amount_cents, 4200);
        assert_eq!(payments[0].payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(f.notifier.count_of_kind("payment_confirmation"), 1);
    }

    #[tokio::test]
    async fn duplicate_invoice_records_once_and_emails_once() {
        let f = fixture(SubscriptionStatus::Active);
        let inv = invoice(Some("sub_1"), None);

        f.handler.on_payment_succeeded(&inv).await.unwrap();
        let second = f.handler.on_payment_succeeded(&inv).await.unwrap();

        assert!(matches!(second, HandlerOutcome::Skipped(_)));
        assert_eq!(f.store.payments().len(), 1);
        assert_eq!(f.notifier.count_of_kind("payment_confirmation"), 1);
    }

    #[tokio::test]
    async fn zero_amount_invoice_is_skipped_without_receipt() {
        let f = fixture(SubscriptionStatus::Trialing);
        let mut trial = invoice(Some("sub_1"), None);
        trial.amount_paid = 0;

        let outcome = f.handler.on_payment_succeeded(&trial).await.unwrap();

        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
        assert!(f.store.payments().is_empty());
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_subscription_is_skipped() {
        let f = fixture(SubscriptionStatus::Active);

        let outcome = f
            .handler
            .on_payment_succeeded(&invoice(Some("sub_other"), None))
            .await
            .unwrap();

        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
        assert!(f.store.payments().is_empty());
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_the_event() {
        let f = fixture(SubscriptionStatus::Active);
        f.notifier.set_failing(true);

        let outcome = f
            .handler
            .on_payment_succeeded(&invoice(Some("sub_1"), None))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(f.store.payments().len(), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Payment failed
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_payment_marks_past_due_without_email() {
        let f = fixture(SubscriptionStatus::Active);

        let outcome = f
            .handler
            .on_payment_failed(&invoice(Some("sub_1"), None))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(
            f.store.subscription("sub_1").unwrap().status,
            SubscriptionStatus::PastDue
        );
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_payment_leaves_canceled_subscription_alone() {
        let f = fixture(SubscriptionStatus::Canceled);

        let outcome = f
            .handler
            .on_payment_failed(&invoice(Some("sub_1"), None))
            .await
            .unwrap();

        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
        assert_eq!(
            f.store.subscription("sub_1").unwrap().status,
            SubscriptionStatus::Canceled
        );
    }
}
