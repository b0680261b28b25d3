//! Stripe API objects as they arrive in webhook payloads.
//!
//! Fields are optional wherever Stripe omits them for some object shapes,
//! so that a partial payload still deserializes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::billing::metadata_keys;

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    pub customer: Option<String>,

    /// Email prefilled or entered during checkout.
    pub customer_email: Option<String>,

    /// Details collected from the customer during checkout.
    pub customer_details: Option<StripeCustomerDetails>,

    /// Subscription ID if checkout created a subscription.
    pub subscription: Option<String>,

    pub payment_status: Option<String>,

    /// Payment mode (payment, setup, subscription).
    pub mode: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl StripeCheckoutSession {
    /// Email the customer paid with, preferring the collected details.
    pub fn payer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .filter(|e| !e.trim().is_empty())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscription
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    pub customer: Option<String>,

    /// Raw Stripe status, mapped to the domain enum by the synchronizer.
    pub status: String,

    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    pub canceled_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub trial_start: Option<i64>,
    pub trial_end: Option<i64>,

    pub cancellation_details: Option<StripeCancellationDetails>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeCancellationDetails {
    /// cancellation_requested, payment_disputed, or payment_failed.
    pub reason: Option<String>,
}

/// Stripe list container.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub id: Option<String>,

    pub price: StripePrice,

    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Stripe Price object (embedded in subscription items).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    pub id: String,

    /// Unit amount in cents.
    pub unit_amount: Option<i64>,

    /// Currency (lowercase, e.g., "usd").
    pub currency: String,

    pub recurring: Option<StripePriceRecurring>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePriceRecurring {
    /// Billing interval (day, week, month, year).
    pub interval: String,

    #[serde(default = "default_interval_count")]
    pub interval_count: i32,
}

fn default_interval_count() -> i32 {
    1
}

impl StripeSubscription {
    /// The first item's price. Coaching subscriptions carry one item.
    pub fn primary_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    /// Recurring amount across all items, in cents. Saturates on overflow.
    pub fn amount_cents(&self) -> i64 {
        self.items
            .data
            .iter()
            .map(|item| item.price.unit_amount.unwrap_or(0).saturating_mul(item.quantity))
            .fold(0i64, i64::saturating_add)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Invoice
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Invoice object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoice {
    /// Unique invoice identifier (in_...).
    pub id: String,

    pub customer: Option<String>,

    /// Associated subscription ID.
    pub subscription: Option<String>,

    pub status: Option<String>,

    /// Amount paid in cents.
    #[serde(default)]
    pub amount_paid: i64,

    #[serde(default)]
    pub currency: String,

    /// Platform fee collected on a connected-account charge.
    pub application_fee_amount: Option<i64>,

    pub payment_intent: Option<String>,

    pub charge: Option<String>,

    #[serde(default)]
    pub attempt_count: i32,

    pub created: Option<i64>,

    pub status_transitions: Option<StripeInvoiceStatusTransitions>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeInvoiceStatusTransitions {
    pub paid_at: Option<i64>,
}

impl StripeInvoice {
    /// Unix time the invoice was paid, falling back to its creation time.
    pub fn paid_at(&self) -> Option<i64> {
        self.status_transitions
            .as_ref()
            .and_then(|t| t.paid_at)
            .or(self.created)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Charges and refunds
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Charge object (payload of `charge.refunded`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCharge {
    /// Unique charge identifier (ch_...).
    pub id: String,

    #[serde(default)]
    pub amount: i64,

    #[serde(default)]
    pub amount_refunded: i64,

    #[serde(default)]
    pub currency: String,

    pub invoice: Option<String>,

    pub payment_intent: Option<String>,

    #[serde(default)]
    pub refunded: bool,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Refund object (payload of `charge.refund.updated`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeRefund {
    /// Unique refund identifier (re_...).
    pub id: String,

    #[serde(default)]
    pub amount: i64,

    pub charge: Option<String>,

    pub payment_intent: Option<String>,

    /// pending, requires_action, succeeded, failed, or canceled.
    pub status: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeRefund {
    pub fn is_succeeded(&self) -> bool {
        self.status.as_deref() == Some("succeeded")
    }
}

/// Processor identifiers describing one refund, whatever object carried it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefundNotice {
    pub invoice_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub charge_id: Option<String>,
    pub amount_refunded_cents: i64,
    /// External subscription id carried on the charge itself.
    pub subscription_ref: Option<String>,
}

impl From<&StripeCharge> for RefundNotice {
    fn from(charge: &StripeCharge) -> Self {
        Self {
            invoice_id: charge.invoice.clone(),
            payment_intent_id: charge.payment_intent.clone(),
            charge_id: Some(charge.id.clone()),
            amount_refunded_cents: charge.amount_refunded,
            subscription_ref: non_blank(&charge.metadata, metadata_keys::SUBSCRIPTION_ID),
        }
    }
}

impl From<&StripeRefund> for RefundNotice {
    fn from(refund: &StripeRefund) -> Self {
        Self {
            invoice_id: None,
            payment_intent_id: refund.payment_intent.clone(),
            charge_id: refund.charge.clone(),
            amount_refunded_cents: refund.amount,
            subscription_ref: non_blank(&refund.metadata, metadata_keys::SUBSCRIPTION_ID),
        }
    }
}

fn non_blank(map: &HashMap<String, String>, key: &str) -> Option<String> {
    map.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkout_session_prefers_customer_details_email() {
        let session: StripeCheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "customer_email": "old@x.com",
            "customer_details": {"email": "new@x.com"},
            "subscription": "sub_1"
        }))
        .unwrap();

        assert_eq!(session.payer_email(), Some("new@x.com"));
        assert!(session.metadata.is_empty());
    }

    #[test]
    fn subscription_amount_sums_items() {
        let sub: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "items": {"data": [
                {"price": {"id": "price_a", "unit_amount": 5000, "currency": "usd",
                           "recurring": {"interval": "month"}}, "quantity": 1},
                {"price": {"id": "price_b", "unit_amount": 1000, "currency": "usd"}, "quantity": 2}
            ]}
        }))
        .unwrap();

        assert_eq!(sub.amount_cents(), 7000);
        let item = sub.primary_item().unwrap();
        assert_eq!(item.price.id, "price_a");
        assert_eq!(item.price.recurring.as_ref().unwrap().interval_count, 1);
    }

    #[test]
    fn subscription_without_items_deserializes() {
        let sub: StripeSubscription =
            serde_json::from_value(json!({"id": "sub_1", "status": "active", "items": {}}))
                .unwrap();
        assert!(sub.primary_item().is_none());
        assert_eq!(sub.amount_cents(), 0);
    }

    #[test]
    fn subscription_amount_saturates_on_absurd_quantity() {
        let sub: StripeSubscription = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "items": {"data": [
                {"price": {"id": "price_a", "unit_amount": i64::MAX, "currency": "usd"}, "quantity": 3},
                {"price": {"id": "price_b", "unit_amount": 1000, "currency": "usd"}, "quantity": 1}
            ]}
        }))
        .unwrap();
        assert_eq!(sub.amount_cents(), i64::MAX);
    }

    #[test]
    fn invoice_paid_at_falls_back_to_created() {
        let invoice: StripeInvoice = serde_json::from_value(json!({
            "id": "in_1", "amount_paid": 5000, "currency": "usd", "created": 100
        }))
        .unwrap();
        assert_eq!(invoice.paid_at(), Some(100));
    }

    #[test]
    fn refund_notice_from_charge_without_invoice() {
        let charge: StripeCharge = serde_json::from_value(json!({
            "id": "ch_1",
            "amount": 5000,
            "amount_refunded": 5000,
            "payment_intent": "pi_1",
            "metadata": {"subscription_id": "sub_1"}
        }))
        .unwrap();

        let notice = RefundNotice::from(&charge);
        assert!(notice.invoice_id.is_none());
        assert_eq!(notice.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(notice.charge_id.as_deref(), Some("ch_1"));
        assert_eq!(notice.subscription_ref.as_deref(), Some("sub_1"));
    }

    #[test]
    fn refund_status_gate() {
        let refund: StripeRefund = serde_json::from_value(json!({
            "id": "re_1", "amount": 100, "charge": "ch_1", "status": "pending"
        }))
        .unwrap();
        assert!(!refund.is_succeeded());
    }
}
