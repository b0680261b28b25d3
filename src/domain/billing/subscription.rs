//! Subscription - local mirror of a Stripe subscription.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AccountId, SubscriptionId, Timestamp, ValidationError};

/// Cancellation reason recorded when a refund force-cancels a subscription.
pub const REFUND_CANCELLATION_REASON: &str = "refunded";

/// Lifecycle status, mirroring Stripe's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
}

impl SubscriptionStatus {
    /// Statuses from which no further billing occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled | SubscriptionStatus::Unpaid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            "incomplete_expired" => Ok(SubscriptionStatus::IncompleteExpired),
            "paused" => Ok(SubscriptionStatus::Paused),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// One recurring billing relationship between a coach and a student.
///
/// At most one record exists per `external_id`. Records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// Stripe subscription id (`sub_...`).
    pub external_id: String,
    pub coach_id: AccountId,
    pub student_id: AccountId,
    pub price_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub interval: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub trial_start: Option<Timestamp>,
    pub trial_end: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Forces the subscription into `canceled`, collapsing the current
    /// period to `now`.
    pub fn force_cancel(&mut self, reason: &str, now: Timestamp) {
        self.status = SubscriptionStatus::Canceled;
        self.cancellation_reason = Some(reason.to_string());
        self.canceled_at = Some(now);
        self.cancel_at_period_end = false;
        self.current_period_end = Some(now);
        if self
            .current_period_start
            .map(|start| start.is_after(&now))
            .unwrap_or(false)
        {
            self.current_period_start = Some(now);
        }
        self.updated_at = now;
    }

    pub fn mark_past_due(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::PastDue;
        self.updated_at = now;
    }
}

#[cfg(test)]
pub(crate) fn test_subscription(external_id: &str, status: SubscriptionStatus) -> Subscription {
    let now = Timestamp::now();
    Subscription {
        id: SubscriptionId::new(),
        external_id: external_id.to_string(),
        coach_id: AccountId::new(),
        student_id: AccountId::new(),
        price_id: Some("price_123".to_string()),
        amount_cents: 5000,
        currency: "usd".to_string(),
        interval: Some("month".to_string()),
        status,
        current_period_start: Some(now),
        current_period_end: Some(now.add_days(30)),
        cancel_at_period_end: false,
        canceled_at: None,
        cancellation_reason: None,
        trial_start: None,
        trial_end: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_canceled_and_unpaid_are_terminal() {
        use SubscriptionStatus::*;
        for status in [Trialing, Active, PastDue, Incomplete, IncompleteExpired, Paused] {
            assert!(!status.is_terminal(), "{} should not be terminal", status);
        }
        assert!(Canceled.is_terminal());
        assert!(Unpaid.is_terminal());
    }

    #[test]
    fn status_parses_every_stripe_value() {
        for raw in [
            "trialing",
            "active",
            "past_due",
            "canceled",
            "unpaid",
            "incomplete",
            "incomplete_expired",
            "paused",
        ] {
            let status: SubscriptionStatus = raw.parse().unwrap();
            assert_eq!(status.as_str(), raw);
        }
        assert!("cancelled".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn force_cancel_collapses_period_to_now() {
        let mut sub = test_subscription("sub_1", SubscriptionStatus::Active);
        let now = Timestamp::now();

        sub.force_cancel(REFUND_CANCELLATION_REASON, now);

        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.cancellation_reason.as_deref(), Some("refunded"));
        assert_eq!(sub.canceled_at, Some(now));
        assert_eq!(sub.current_period_end, Some(now));
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn mark_past_due_sets_status() {
        let mut sub = test_subscription("sub_1", SubscriptionStatus::Active);
        sub.mark_past_due(Timestamp::now());
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
    }
}
