//! CancellationCascade - dependent changes when a subscription ends.
//!
//! Deactivating the coach-student link is idempotent and runs every time
//! a terminal status is written. The notification is sent by callers only
//! on the transitions they decide count.

use std::sync::Arc;

use crate::domain::billing::Subscription;
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::WebhookError;
use crate::ports::{AccountRepository, CoachStudentLinkRepository, Notification, NotificationSender};

/// Why a subscription entered a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeReason {
    Canceled,
    Refunded { amount_cents: i64, currency: String },
}

pub struct CancellationCascade {
    accounts: Arc<dyn AccountRepository>,
    links: Arc<dyn CoachStudentLinkRepository>,
    notifier: Arc<dyn NotificationSender>,
}

impl CancellationCascade {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        links: Arc<dyn CoachStudentLinkRepository>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            accounts,
            links,
            notifier,
        }
    }

    /// Sets the coach-student link inactive. Safe to repeat.
    pub async fn deactivate_link(&self, subscription: &Subscription) -> Result<bool, WebhookError> {
        let changed = self
            .links
            .deactivate(&subscription.coach_id, &subscription.student_id, Timestamp::now())
            .await?;
        if changed {
            tracing::info!(
                coach_id = %subscription.coach_id,
                student_id = %subscription.student_id,
                subscription_id = %subscription.external_id,
                "Coach-student link deactivated"
            );
        }
        Ok(changed)
    }

    /// Sends the cancellation or refund email to the student.
    ///
    /// Failures are logged and swallowed; the state change already happened.
    pub async fn notify(&self, subscription: &Subscription, reason: CascadeReason) {
        let student = match self.accounts.find_by_id(&subscription.student_id).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                tracing::warn!(
                    student_id = %subscription.student_id,
                    subscription_id = %subscription.external_id,
                    "No student account to notify"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    subscription_id = %subscription.external_id,
                    error = %e,
                    "Failed to load student for cascade notification"
                );
                return;
            }
        };

        let notification = match reason {
            CascadeReason::Canceled => Notification::Cancellation {
                to: student.email.clone(),
                student_name: student.full_name.clone(),
                subscription_id: subscription.external_id.clone(),
            },
            CascadeReason::Refunded {
                amount_cents,
                currency,
            } => Notification::Refund {
                to: student.email.clone(),
                student_name: student.full_name.clone(),
                amount_cents,
                currency,
            },
        };

        let kind = notification.kind();
        if let Err(e) = self.notifier.send(notification).await {
            tracing::error!(
                kind,
                subscription_id = %subscription.external_id,
                error = %e,
                "Failed to send cascade notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, RecordingNotificationSender};
    use crate::domain::billing::{test_subscription, Account, CoachStudentLink, SubscriptionStatus};

    fn setup() -> (InMemoryBillingStore, RecordingNotificationSender, CancellationCascade) {
        let store = InMemoryBillingStore::new();
        let notifier = RecordingNotificationSender::new();
        let cascade = CancellationCascade::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
        );
        (store, notifier, cascade)
    }

    #[tokio::test]
    async fn deactivate_link_reports_first_change_only() {
        let (store, _, cascade) = setup();
        let sub = test_subscription("sub_1", SubscriptionStatus::Canceled);
        store.put_link(CoachStudentLink::new_active(sub.coach_id, sub.student_id, Timestamp::now()));

        assert!(cascade.deactivate_link(&sub).await.unwrap());
        assert!(!cascade.deactivate_link(&sub).await.unwrap());
        assert!(!store.link(&sub.coach_id, &sub.student_id).unwrap().active);
    }

    #[tokio::test]
    async fn notify_sends_refund_email_to_student() {
        let (store, notifier, cascade) = setup();
        let sub = test_subscription("sub_1", SubscriptionStatus::Canceled);
        store.put_account(Account::new_student(
            sub.student_id,
            "e@x.com",
            None,
            None,
            sub.coach_id,
            Timestamp::now(),
        ));

        cascade
            .notify(
                &sub,
                CascadeReason::Refunded {
                    amount_cents: 5000,
                    currency: "usd".to_string(),
                },
            )
            .await;

        let sent = notifier.sent_of_kind("refund");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient(), "e@x.com");
    }

    #[tokio::test]
    async fn notify_without_student_account_sends_nothing() {
        let (_, notifier, cascade) = setup();
        let sub = test_subscription("sub_1", SubscriptionStatus::Canceled);

        cascade.notify(&sub, CascadeReason::Canceled).await;

        assert!(notifier.sent().is_empty());
    }
}
