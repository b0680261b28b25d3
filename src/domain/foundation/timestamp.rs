//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts a Stripe Unix-seconds field.
    ///
    /// Returns `None` for values chrono cannot represent.
    pub fn from_unix(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Converts an optional Stripe Unix-seconds field.
    pub fn from_unix_opt(secs: Option<i64>) -> Option<Self> {
        secs.and_then(Self::from_unix)
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix(&self) -> i64 {
        self.0.timestamp()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn from_unix_round_trips() {
        let ts = Timestamp::from_unix(1_704_067_200).unwrap();
        assert_eq!(ts.as_unix(), 1_704_067_200);
    }

    #[test]
    fn from_unix_opt_passes_none_through() {
        assert!(Timestamp::from_unix_opt(None).is_none());
        assert!(Timestamp::from_unix_opt(Some(0)).is_some());
    }

    #[test]
    fn ordering_helpers_agree() {
        let earlier = Timestamp::from_unix(1_000).unwrap();
        let later = earlier.add_days(1);
        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
        assert_eq!(later.as_unix() - earlier.as_unix(), 86_400);
    }
}
