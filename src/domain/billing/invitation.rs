//! Invitation - single-use token binding a prospective student to a coach.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AccountId, InvitationId, Timestamp, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Completed,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "completed" => Ok(InvitationStatus::Completed),
            other => Err(ValidationError::invalid_format(
                "invitation_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Invitation created by the onboarding flow and consumed by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub token: String,
    pub coach_id: AccountId,
    pub student_email: String,
    pub student_name: Option<String>,
    pub payment_due_day: Option<u8>,
    pub expires_at: Timestamp,
    pub status: InvitationStatus,
    pub completed_at: Option<Timestamp>,
    pub student_id: Option<AccountId>,
    pub created_at: Timestamp,
}

/// Result of attempting to consume an invitation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This call moved the invitation from pending to completed.
    Consumed,
    /// The invitation was already completed by an earlier call.
    AlreadyConsumed,
    /// No invitation exists for the token.
    NotFound,
}

impl Invitation {
    /// Creates a pending invitation.
    pub fn new(
        token: impl Into<String>,
        coach_id: AccountId,
        student_email: impl Into<String>,
        student_name: Option<String>,
        payment_due_day: Option<u8>,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            id: InvitationId::new(),
            token: token.into(),
            coach_id,
            student_email: student_email.into(),
            student_name,
            payment_due_day,
            expires_at,
            status: InvitationStatus::Pending,
            completed_at: None,
            student_id: None,
            created_at: Timestamp::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Completes the invitation if it is still pending.
    ///
    /// A completed invitation is never rebound to another student.
    pub fn consume(&mut self, student_id: AccountId, now: Timestamp) -> ConsumeOutcome {
        if !self.is_pending() {
            return ConsumeOutcome::AlreadyConsumed;
        }
        self.status = InvitationStatus::Completed;
        self.completed_at = Some(now);
        self.student_id = Some(student_id);
        ConsumeOutcome::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Invitation {
        Invitation::new(
            "T1",
            AccountId::new(),
            "e@x.com",
            None,
            Some(5),
            Timestamp::now().add_days(7),
        )
    }

    #[test]
    fn consume_completes_pending_invitation() {
        let mut inv = pending();
        let student = AccountId::new();
        let now = Timestamp::now();

        assert_eq!(inv.consume(student, now), ConsumeOutcome::Consumed);
        assert_eq!(inv.status, InvitationStatus::Completed);
        assert_eq!(inv.student_id, Some(student));
        assert_eq!(inv.completed_at, Some(now));
    }

    #[test]
    fn second_consume_keeps_first_binding() {
        let mut inv = pending();
        let first = AccountId::new();
        inv.consume(first, Timestamp::now());

        assert_eq!(
            inv.consume(AccountId::new(), Timestamp::now()),
            ConsumeOutcome::AlreadyConsumed
        );
        assert_eq!(inv.student_id, Some(first));
    }

    #[test]
    fn expiry_is_relative_to_now() {
        let inv = pending();
        assert!(!inv.is_expired(Timestamp::now()));
        assert!(inv.is_expired(Timestamp::now().add_days(8)));
    }
}
