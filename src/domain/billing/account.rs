//! Account - platform user profile (coach or student).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AccountId, Timestamp, ValidationError};

/// Role of a platform account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coach,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coach => "coach",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coach" => Ok(Role::Coach),
            "student" => Ok(Role::Student),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Profile record for an authenticated identity.
///
/// The id is shared with the identity provider. Email is unique across
/// all accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    /// Inviting coach, for students provisioned through checkout.
    pub coach_id: Option<AccountId>,
    /// Set for accounts that have never signed in.
    pub onboarding_required: bool,
    /// Stripe connected account that receives the coach's payouts.
    pub payout_account_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    /// Builds the profile of a student provisioned during guest checkout.
    pub fn new_student(
        id: AccountId,
        email: impl Into<String>,
        full_name: Option<String>,
        phone: Option<String>,
        coach_id: AccountId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            role: Role::Student,
            email: normalize_email(&email.into()),
            full_name,
            phone,
            coach_id: Some(coach_id),
            onboarding_required: true,
            payout_account_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a coach profile.
    pub fn new_coach(
        id: AccountId,
        email: impl Into<String>,
        full_name: Option<String>,
        payout_account_id: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            role: Role::Coach,
            email: normalize_email(&email.into()),
            full_name,
            phone: None,
            coach_id: None,
            onboarding_required: false,
            payout_account_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_coach(&self) -> bool {
        self.role == Role::Coach
    }

    /// Returns the payout account if this is a coach with one connected.
    pub fn payout_destination(&self) -> Option<&str> {
        if !self.is_coach() {
            return None;
        }
        self.payout_account_id
            .as_deref()
            .filter(|acct| !acct.trim().is_empty())
    }
}

/// Lowercases and trims an email address for lookups and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_student_requires_onboarding_and_links_coach() {
        let coach = AccountId::new();
        let student = Account::new_student(
            AccountId::new(),
            " E@X.com ",
            Some("Eve".to_string()),
            None,
            coach,
            Timestamp::now(),
        );

        assert_eq!(student.role, Role::Student);
        assert_eq!(student.email, "e@x.com");
        assert_eq!(student.coach_id, Some(coach));
        assert!(student.onboarding_required);
        assert!(student.payout_destination().is_none());
    }

    #[test]
    fn coach_payout_destination_ignores_blank_account() {
        let mut coach = Account::new_coach(
            AccountId::new(),
            "c@x.com",
            None,
            Some("acct_123".to_string()),
            Timestamp::now(),
        );
        assert_eq!(coach.payout_destination(), Some("acct_123"));

        coach.payout_account_id = Some("  ".to_string());
        assert!(coach.payout_destination().is_none());
    }

    #[test]
    fn role_parses_known_values() {
        assert_eq!("coach".parse::<Role>().unwrap(), Role::Coach);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert!("admin".parse::<Role>().is_err());
    }
}
