//! NotificationSender port - transactional email.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::DomainError;

/// A transactional email the reconciliation engine can trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Sent once to a student account provisioned by guest checkout.
    Welcome {
        to: String,
        student_name: Option<String>,
        coach_name: Option<String>,
        activation_link: String,
    },
    PaymentConfirmation {
        to: String,
        student_name: Option<String>,
        amount_cents: i64,
        currency: String,
        invoice_id: Option<String>,
    },
    Cancellation {
        to: String,
        student_name: Option<String>,
        subscription_id: String,
    },
    Refund {
        to: String,
        student_name: Option<String>,
        amount_cents: i64,
        currency: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::Welcome { to, .. }
            | Notification::PaymentConfirmation { to, .. }
            | Notification::Cancellation { to, .. }
            | Notification::Refund { to, .. } => to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::PaymentConfirmation { .. } => "payment_confirmation",
            Notification::Cancellation { .. } => "cancellation",
            Notification::Refund { .. } => "refund",
        }
    }
}

/// Port for sending transactional email.
///
/// Send failures are reported but never retried by the caller.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), DomainError>;
}

/// Formats integer cents as a display amount, e.g. `50.00 USD`.
pub fn format_amount(amount_cents: i64, currency: &str) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_and_kind() {
        let n = Notification::Cancellation {
            to: "e@x.com".to_string(),
            student_name: None,
            subscription_id: "sub_1".to_string(),
        };
        assert_eq!(n.recipient(), "e@x.com");
        assert_eq!(n.kind(), "cancellation");
    }

    #[test]
    fn format_amount_renders_cents() {
        assert_eq!(format_amount(5000, "usd"), "50.00 USD");
        assert_eq!(format_amount(1999, "brl"), "19.99 BRL");
        assert_eq!(format_amount(-5, "usd"), "-0.05 USD");
    }
}
