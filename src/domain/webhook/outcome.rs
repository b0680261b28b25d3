//! Result of running one webhook handler.

use serde::Serialize;
use std::fmt;

/// What a handler did with an event.
///
/// All three variants are acknowledged to Stripe with 200. `Failed` marks a
/// permanent business failure that redelivery cannot fix; it is logged and
/// kept in the webhook ledger for out-of-band follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum HandlerOutcome {
    Applied(String),
    Skipped(String),
    Failed(String),
}

impl HandlerOutcome {
    pub fn applied(summary: impl Into<String>) -> Self {
        HandlerOutcome::Applied(summary.into())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        HandlerOutcome::Skipped(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerOutcome::Failed(reason.into())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerOutcome::Applied(_) => "applied",
            HandlerOutcome::Skipped(_) => "skipped",
            HandlerOutcome::Failed(_) => "failed",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            HandlerOutcome::Applied(s) | HandlerOutcome::Skipped(s) | HandlerOutcome::Failed(s) => s,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, HandlerOutcome::Applied(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, HandlerOutcome::Failed(_))
    }
}

impl fmt::Display for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.detail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        assert_eq!(
            HandlerOutcome::skipped("no local subscription").to_string(),
            "skipped: no local subscription"
        );
    }

    #[test]
    fn serializes_with_outcome_tag() {
        let json = serde_json::to_value(HandlerOutcome::applied("payment recorded")).unwrap();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["detail"], "payment recorded");
    }
}
