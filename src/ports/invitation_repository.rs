//! InvitationRepository port - coach-to-student invitation tokens.
//!
//! Invitations are created by the onboarding flow. The reconciliation
//! engine only reads them and consumes them once.

use async_trait::async_trait;

use crate::domain::billing::{ConsumeOutcome, Invitation};
use crate::domain::foundation::{AccountId, DomainError, Timestamp};

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Find an invitation by its token.
    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, DomainError>;

    /// Complete a pending invitation, binding it to `student_id`.
    ///
    /// This is a conditional update: only a pending invitation changes.
    /// Two concurrent calls for one token yield exactly one `Consumed`.
    async fn consume(
        &self,
        token: &str,
        student_id: &AccountId,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, DomainError>;
}
