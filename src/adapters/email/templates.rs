//! Plain-text email bodies for each notification kind.

use crate::ports::{format_amount, Notification};

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
}

fn greeting(name: &Option<String>) -> String {
    match name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hi {},", name),
        None => "Hi,".to_string(),
    }
}

pub fn render(notification: &Notification) -> RenderedEmail {
    match notification {
        Notification::Welcome {
            student_name,
            coach_name,
            activation_link,
            ..
        } => {
            let coach = coach_name.as_deref().unwrap_or("your coach");
            RenderedEmail {
                subject: "Welcome! Activate your account".to_string(),
                text: format!(
                    "{}\n\nYour subscription with {} is confirmed. Set up your account here:\n\n{}\n",
                    greeting(student_name),
                    coach,
                    activation_link
                ),
            }
        }
        Notification::PaymentConfirmation {
            student_name,
            amount_cents,
            currency,
            invoice_id,
            ..
        } => RenderedEmail {
            subject: "Payment received".to_string(),
            text: format!(
                "{}\n\nWe received your payment of {}.{}\n",
                greeting(student_name),
                format_amount(*amount_cents, currency),
                invoice_id
                    .as_deref()
                    .map(|id| format!("\nInvoice: {}", id))
                    .unwrap_or_default()
            ),
        },
        Notification::Cancellation { student_name, .. } => RenderedEmail {
            subject: "Your subscription has ended".to_string(),
            text: format!(
                "{}\n\nYour coaching subscription has been canceled. You will not be charged again.\n",
                greeting(student_name)
            ),
        },
        Notification::Refund {
            student_name,
            amount_cents,
            currency,
            ..
        } => RenderedEmail {
            subject: "Refund issued".to_string(),
            text: format!(
                "{}\n\nA refund of {} has been issued and your subscription has been canceled.\n",
                greeting(student_name),
                format_amount(*amount_cents, currency)
            ),
        },
    }
}
