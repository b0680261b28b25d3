//! SubscriptionRepository port - local mirror of Stripe subscriptions.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId};

/// Repository port for mirrored subscriptions.
///
/// Implementations must ensure:
/// - Unique `external_id` (one row per Stripe subscription)
/// - Rows are never deleted
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by local id.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find a subscription by its Stripe id (`sub_...`).
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Insert or overwrite the row keyed by `external_id`.
    ///
    /// On conflict every mirrored field is replaced while the stored local
    /// `id` and `created_at` are kept. Returns the row as stored.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription, DomainError>;
}
