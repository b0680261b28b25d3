//! CoachStudentLink - the coaching relationship, independent of billing.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachStudentLink {
    pub coach_id: AccountId,
    pub student_id: AccountId,
    pub active: bool,
    pub created_at: Timestamp,
    pub deactivated_at: Option<Timestamp>,
}

impl CoachStudentLink {
    pub fn new_active(coach_id: AccountId, student_id: AccountId, now: Timestamp) -> Self {
        Self {
            coach_id,
            student_id,
            active: true,
            created_at: now,
            deactivated_at: None,
        }
    }

    /// Sets the link inactive. Keeps the first deactivation time.
    pub fn deactivate(&mut self, now: Timestamp) {
        if self.active {
            self.active = false;
            self.deactivated_at = Some(now);
        }
    }
}
