//! CoachStudentLinkRepository port - coaching relationships.

use async_trait::async_trait;

use super::InsertResult;
use crate::domain::billing::CoachStudentLink;
use crate::domain::foundation::{AccountId, DomainError, Timestamp};

#[async_trait]
pub trait CoachStudentLinkRepository: Send + Sync {
    /// Insert the link unless one exists for the pair. Never reactivates.
    async fn insert_if_absent(&self, link: &CoachStudentLink) -> Result<InsertResult, DomainError>;

    /// Set the link inactive.
    ///
    /// Idempotent. Returns `true` if a row changed from active to inactive.
    async fn deactivate(
        &self,
        coach_id: &AccountId,
        student_id: &AccountId,
        now: Timestamp,
    ) -> Result<bool, DomainError>;
}
