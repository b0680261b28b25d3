//! Payment - one recorded charge against a subscription.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fees::FeeSplit;
use super::subscription::Subscription;
use crate::domain::foundation::{AccountId, PaymentId, SubscriptionId, Timestamp, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Recorded monetary transaction.
///
/// `invoice_id` is the natural unique key. `payment_intent_id` and
/// `charge_id` are fallback keys for refund reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub charge_id: Option<String>,
    pub subscription_id: Option<SubscriptionId>,
    pub external_subscription_id: Option<String>,
    pub coach_id: AccountId,
    pub student_id: AccountId,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub coach_amount_cents: i64,
    pub processor_fee_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub refunded_amount_cents: i64,
    pub refunded_at: Option<Timestamp>,
    pub paid_at: Timestamp,
    pub created_at: Timestamp,
}

/// Processor identifiers of a paid invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargeRefs {
    pub invoice_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub charge_id: Option<String>,
}

impl Payment {
    /// Records a successful invoice payment against a subscription.
    pub fn succeeded(
        subscription: &Subscription,
        refs: ChargeRefs,
        split: FeeSplit,
        currency: impl Into<String>,
        paid_at: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            invoice_id: refs.invoice_id,
            payment_intent_id: refs.payment_intent_id,
            charge_id: refs.charge_id,
            subscription_id: Some(subscription.id),
            external_subscription_id: Some(subscription.external_id.clone()),
            coach_id: subscription.coach_id,
            student_id: subscription.student_id,
            amount_cents: split.amount_cents,
            platform_fee_cents: split.platform_fee_cents,
            coach_amount_cents: split.coach_amount_cents,
            processor_fee_cents: split.processor_fee_cents,
            currency: currency.into(),
            status: PaymentStatus::Succeeded,
            refunded_amount_cents: 0,
            refunded_at: None,
            paid_at,
            created_at: Timestamp::now(),
        }
    }

    pub fn is_refunded(&self) -> bool {
        self.status == PaymentStatus::Refunded
    }

    /// Adds refund information; the refunded amount never exceeds the charge.
    pub fn mark_refunded(&mut self, amount_cents: i64, now: Timestamp) {
        self.status = PaymentStatus::Refunded;
        self.refunded_amount_cents = amount_cents.clamp(0, self.amount_cents);
        self.refunded_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::subscription::test_subscription;
    use crate::domain::billing::SubscriptionStatus;

    fn split(amount: i64) -> FeeSplit {
        FeeSplit {
            amount_cents: amount,
            platform_fee_cents: amount / 10,
            coach_amount_cents: amount - amount / 10,
            processor_fee_cents: 0,
        }
    }

    #[test]
    fn succeeded_copies_subscription_context() {
        let sub = test_subscription("sub_1", SubscriptionStatus::Active);
        let payment = Payment::succeeded(
            &sub,
            ChargeRefs {
                invoice_id: Some("in_1".to_string()),
                ..Default::default()
            },
            split(5000),
            "usd",
            Timestamp::now(),
        );

        assert_eq!(payment.subscription_id, Some(sub.id));
        assert_eq!(payment.external_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(payment.coach_id, sub.coach_id);
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.coach_amount_cents, 4500);
    }

    #[test]
    fn mark_refunded_clamps_amount() {
        let sub = test_subscription("sub_1", SubscriptionStatus::Active);
        let mut payment =
            Payment::succeeded(&sub, ChargeRefs::default(), split(5000), "usd", Timestamp::now());

        payment.mark_refunded(9000, Timestamp::now());

        assert!(payment.is_refunded());
        assert_eq!(payment.refunded_amount_cents, 5000);
        assert!(payment.refunded_at.is_some());
    }
}
