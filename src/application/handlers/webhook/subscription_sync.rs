//! SubscriptionSynchronizer - mirrors a Stripe subscription locally.
//!
//! Handles `customer.subscription.{created,updated,deleted}` and is invoked
//! directly by checkout completion.

use std::sync::Arc;

use super::cancellation_cascade::{CancellationCascade, CascadeReason};
use crate::domain::billing::{BillingMetadata, ParsedMetadata, Subscription, SubscriptionStatus};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::domain::webhook::{HandlerOutcome, StripeSubscription, WebhookError};
use crate::ports::SubscriptionRepository;

pub struct SubscriptionSynchronizer {
    subscriptions: Arc<dyn SubscriptionRepository>,
    cascade: Arc<CancellationCascade>,
}

impl SubscriptionSynchronizer {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        cascade: Arc<CancellationCascade>,
    ) -> Self {
        Self {
            subscriptions,
            cascade,
        }
    }

    /// Upserts the local record from the processor's object.
    ///
    /// Coach and student ids come from the object's metadata, falling back
    /// to the stored record. The cancellation email goes out only on a
    /// transition from a non-terminal (or unknown) status into a terminal
    /// one; the link is deactivated whenever the new status is terminal.
    pub async fn sync(&self, remote: &StripeSubscription) -> Result<HandlerOutcome, WebhookError> {
        let status: SubscriptionStatus = match remote.status.parse() {
            Ok(status) => status,
            Err(e) => {
                return Ok(HandlerOutcome::failed(format!(
                    "subscription {}: {}",
                    remote.id, e
                )))
            }
        };

        let parsed = BillingMetadata::from_map(&remote.metadata).unwrap_or_else(|e| {
            tracing::warn!(
                subscription_id = %remote.id,
                error = %e,
                "Ignoring invalid subscription metadata"
            );
            ParsedMetadata::default()
        });
        for e in &parsed.rejected {
            tracing::warn!(
                subscription_id = %remote.id,
                error = %e,
                "Ignoring invalid subscription metadata field"
            );
        }
        let metadata = parsed.metadata;

        let previous = self.subscriptions.find_by_external_id(&remote.id).await?;

        let coach_id = metadata
            .coach_id
            .or_else(|| previous.as_ref().map(|p| p.coach_id));
        let student_id = metadata
            .student_id
            .or_else(|| previous.as_ref().map(|p| p.student_id));
        let (coach_id, student_id) = match (coach_id, student_id) {
            (Some(coach), Some(student)) => (coach, student),
            _ => {
                tracing::info!(
                    subscription_id = %remote.id,
                    "Subscription not reconcilable yet: missing coach or student id"
                );
                return Ok(HandlerOutcome::skipped(format!(
                    "subscription {} has no coach/student ids",
                    remote.id
                )));
            }
        };

        let now = Timestamp::now();
        let item = remote.primary_item();
        let mirrored = Subscription {
            id: previous.as_ref().map(|p| p.id).unwrap_or_else(SubscriptionId::new),
            external_id: remote.id.clone(),
            coach_id,
            student_id,
            price_id: item.map(|i| i.price.id.clone()),
            amount_cents: remote.amount_cents(),
            currency: item
                .map(|i| i.price.currency.clone())
                .or_else(|| previous.as_ref().map(|p| p.currency.clone()))
                .unwrap_or_default(),
            interval: item
                .and_then(|i| i.price.recurring.as_ref())
                .map(|r| r.interval.clone()),
            status,
            current_period_start: Timestamp::from_unix_opt(remote.current_period_start),
            current_period_end: Timestamp::from_unix_opt(remote.current_period_end),
            cancel_at_period_end: remote.cancel_at_period_end,
            canceled_at: Timestamp::from_unix_opt(remote.canceled_at),
            cancellation_reason: remote
                .cancellation_details
                .as_ref()
                .and_then(|d| d.reason.clone())
                .or_else(|| previous.as_ref().and_then(|p| p.cancellation_reason.clone())),
            trial_start: Timestamp::from_unix_opt(remote.trial_start),
            trial_end: Timestamp::from_unix_opt(remote.trial_end),
            created_at: previous.as_ref().map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };

        let stored = self.subscriptions.upsert(&mirrored).await?;

        let was_terminal = previous.as_ref().map(|p| p.is_terminal()).unwrap_or(false);
        if stored.is_terminal() {
            self.cascade.deactivate_link(&stored).await?;
            if !was_terminal {
                tracing::info!(
                    subscription_id = %stored.external_id,
                    status = %stored.status,
                    "Subscription entered terminal status"
                );
                self.cascade.notify(&stored, CascadeReason::Canceled).await;
            }
        }

        Ok(HandlerOutcome::applied(format!(
            "subscription {} synced as {}",
            stored.external_id, stored.status
        )))
    }
}
