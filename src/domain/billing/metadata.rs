//! Typed billing metadata carried on Stripe checkout sessions and
//! subscriptions.
//!
//! Stripe metadata is a flat string map. Everything the reconciliation
//! handlers need from it is parsed and validated once here; handlers never
//! read the raw map.

use std::collections::HashMap;

use crate::domain::foundation::{AccountId, ValidationError};

/// Current metadata layout version written by this service.
pub const METADATA_VERSION: &str = "1";

pub mod keys {
    pub const VERSION: &str = "metadata_version";
    pub const COACH_ID: &str = "coach_id";
    pub const STUDENT_ID: &str = "student_id";
    pub const INVITATION_TOKEN: &str = "invitation_token";
    pub const STUDENT_EMAIL: &str = "student_email";
    pub const STUDENT_NAME: &str = "student_name";
    pub const STUDENT_PHONE: &str = "student_phone";
    pub const PAYMENT_DUE_DAY: &str = "payment_due_day";
    /// Set on charges created outside an invoice.
    pub const SUBSCRIPTION_ID: &str = "subscription_id";
}

const MIN_DUE_DAY: i64 = 1;
const MAX_DUE_DAY: i64 = 31;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingMetadata {
    pub coach_id: Option<AccountId>,
    pub student_id: Option<AccountId>,
    pub invitation_token: Option<String>,
    pub student_email: Option<String>,
    pub student_name: Option<String>,
    pub student_phone: Option<String>,
    pub payment_due_day: Option<u8>,
}

/// A metadata map parsed field by field.
///
/// A field that is present but unusable is left unset and reported in
/// `rejected`; the other fields keep their parsed values.
#[derive(Debug, Clone, Default)]
pub struct ParsedMetadata {
    pub metadata: BillingMetadata,
    pub rejected: Vec<ValidationError>,
}

impl ParsedMetadata {
    /// The first rejection of a participant id, if any.
    pub fn rejected_participant(&self) -> Option<&ValidationError> {
        self.rejected
            .iter()
            .find(|e| matches!(e.field(), keys::COACH_ID | keys::STUDENT_ID))
    }
}

impl BillingMetadata {
    /// Parses a Stripe metadata map.
    ///
    /// Blank values count as absent. A missing version is read as the
    /// current one, since checkout sessions are created before this service
    /// stamps anything. Only an unsupported version fails the whole map.
    pub fn from_map(map: &HashMap<String, String>) -> Result<ParsedMetadata, ValidationError> {
        if let Some(version) = non_blank(map, keys::VERSION) {
            if version != METADATA_VERSION {
                return Err(ValidationError::invalid_format(
                    keys::VERSION,
                    format!("unsupported version '{}'", version),
                ));
            }
        }

        let mut rejected = Vec::new();
        let coach_id = keep(parse_account_id(map, keys::COACH_ID), &mut rejected);
        let student_id = keep(parse_account_id(map, keys::STUDENT_ID), &mut rejected);
        let payment_due_day = keep(parse_due_day(map), &mut rejected);

        let metadata = Self {
            coach_id,
            student_id,
            invitation_token: non_blank(map, keys::INVITATION_TOKEN).map(str::to_string),
            student_email: non_blank(map, keys::STUDENT_EMAIL).map(|e| e.to_lowercase()),
            student_name: non_blank(map, keys::STUDENT_NAME).map(str::to_string),
            student_phone: non_blank(map, keys::STUDENT_PHONE).map(str::to_string),
            payment_due_day,
        };
        Ok(ParsedMetadata { metadata, rejected })
    }

    /// True for a checkout paid by someone without an account yet.
    pub fn is_guest_checkout(&self) -> bool {
        self.invitation_token.is_some() && self.student_email.is_some() && self.student_id.is_none()
    }

    pub fn with_student(mut self, student_id: AccountId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    /// Serializes back into a Stripe metadata map, stamped with the current
    /// version. Absent fields are omitted.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(keys::VERSION.to_string(), METADATA_VERSION.to_string());

        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        put(keys::COACH_ID, self.coach_id.map(|id| id.to_string()));
        put(keys::STUDENT_ID, self.student_id.map(|id| id.to_string()));
        put(keys::INVITATION_TOKEN, self.invitation_token.clone());
        put(keys::STUDENT_EMAIL, self.student_email.clone());
        put(keys::STUDENT_NAME, self.student_name.clone());
        put(keys::STUDENT_PHONE, self.student_phone.clone());
        put(
            keys::PAYMENT_DUE_DAY,
            self.payment_due_day.map(|d| d.to_string()),
        );
        map
    }
}

fn non_blank<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn keep<T>(
    parsed: Result<Option<T>, ValidationError>,
    rejected: &mut Vec<ValidationError>,
) -> Option<T> {
    parsed.unwrap_or_else(|e| {
        rejected.push(e);
        None
    })
}

fn parse_due_day(map: &HashMap<String, String>) -> Result<Option<u8>, ValidationError> {
    let Some(raw) = non_blank(map, keys::PAYMENT_DUE_DAY) else {
        return Ok(None);
    };
    let day: i64 = raw
        .parse()
        .map_err(|_| ValidationError::invalid_format(keys::PAYMENT_DUE_DAY, "not an integer"))?;
    if !(MIN_DUE_DAY..=MAX_DUE_DAY).contains(&day) {
        return Err(ValidationError::out_of_range(
            keys::PAYMENT_DUE_DAY,
            MIN_DUE_DAY,
            MAX_DUE_DAY,
            day,
        ));
    }
    Ok(u8::try_from(day).ok())
}

fn parse_account_id(
    map: &HashMap<String, String>,
    key: &'static str,
) -> Result<Option<AccountId>, ValidationError> {
    non_blank(map, key)
        .map(|raw| {
            raw.parse::<AccountId>()
                .map_err(|e| ValidationError::invalid_format(key, e.to_string()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse(pairs: &[(&str, &str)]) -> ParsedMetadata {
        BillingMetadata::from_map(&map(pairs)).unwrap()
    }

    #[test]
    fn parses_guest_checkout_metadata() {
        let coach = AccountId::new();
        let parsed = parse(&[
            ("coach_id", &coach.to_string()),
            ("invitation_token", "T1"),
            ("student_email", "E@X.com"),
            ("student_name", "Eve"),
            ("payment_due_day", "5"),
        ]);

        let meta = parsed.metadata;
        assert!(parsed.rejected.is_empty());
        assert_eq!(meta.coach_id, Some(coach));
        assert_eq!(meta.student_email.as_deref(), Some("e@x.com"));
        assert_eq!(meta.payment_due_day, Some(5));
        assert!(meta.is_guest_checkout());
    }

    #[test]
    fn blank_values_are_absent() {
        let parsed = parse(&[("student_id", "  "), ("coach_id", "")]);
        assert!(parsed.rejected.is_empty());
        assert!(parsed.metadata.student_id.is_none());
        assert!(parsed.metadata.coach_id.is_none());
    }

    #[test]
    fn malformed_account_id_is_rejected_alone() {
        let student = AccountId::new();
        let parsed = parse(&[("coach_id", "coach-42"), ("student_id", &student.to_string())]);

        assert!(parsed.metadata.coach_id.is_none());
        assert_eq!(parsed.metadata.student_id, Some(student));
        let err = parsed.rejected_participant().unwrap();
        assert_eq!(err.field(), "coach_id");
    }

    #[test]
    fn late_month_due_days_are_accepted() {
        for day in ["29", "30", "31"] {
            let parsed = parse(&[("payment_due_day", day)]);
            assert!(parsed.rejected.is_empty(), "day {} rejected", day);
            assert!(parsed.metadata.payment_due_day.is_some());
        }
    }

    #[test]
    fn bad_due_day_drops_only_that_field() {
        let coach = AccountId::new();
        let student = AccountId::new();
        let parsed = parse(&[
            ("coach_id", &coach.to_string()),
            ("student_id", &student.to_string()),
            ("payment_due_day", "32"),
        ]);

        assert_eq!(parsed.metadata.coach_id, Some(coach));
        assert_eq!(parsed.metadata.student_id, Some(student));
        assert!(parsed.metadata.payment_due_day.is_none());
        assert!(parsed.rejected_participant().is_none());
        assert!(matches!(
            parsed.rejected.as_slice(),
            [ValidationError::OutOfRange { actual: 32, .. }]
        ));

        let parsed = parse(&[("payment_due_day", "soon")]);
        assert!(matches!(
            parsed.rejected.as_slice(),
            [ValidationError::InvalidFormat { .. }]
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!(BillingMetadata::from_map(&map(&[("metadata_version", "2")])).is_err());
        assert!(BillingMetadata::from_map(&map(&[("metadata_version", "1")])).is_ok());
    }

    #[test]
    fn to_map_stamps_version_and_survives_reparse() {
        let meta = BillingMetadata {
            coach_id: Some(AccountId::new()),
            student_id: Some(AccountId::new()),
            invitation_token: Some("T1".to_string()),
            payment_due_day: Some(30),
            ..Default::default()
        };

        let written = meta.to_map();
        assert_eq!(written.get("metadata_version").map(String::as_str), Some("1"));
        assert!(!written.contains_key("student_phone"));
        assert_eq!(BillingMetadata::from_map(&written).unwrap().metadata, meta);
    }

    #[test]
    fn student_id_ends_guest_checkout() {
        let meta = BillingMetadata {
            invitation_token: Some("T1".to_string()),
            student_email: Some("e@x.com".to_string()),
            ..Default::default()
        };
        assert!(meta.is_guest_checkout());
        assert!(!meta.with_student(AccountId::new()).is_guest_checkout());
    }
}
