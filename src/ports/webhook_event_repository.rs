//! WebhookEventRepository port - ledger of processed Stripe webhooks.
//!
//! Every delivery is recorded with its outcome and payload so that
//! swallowed business failures can be found and replayed out of band.
//!
//! Stripe may deliver the same webhook multiple times due to:
//! - Network timeouts
//! - 5xx response from our endpoint (triggers retry)
//! - Our endpoint returning success but Stripe not receiving it
//!
//! The ledger short-circuits redeliveries of settled events. Handlers stay
//! idempotent on their own; the ledger is not the correctness mechanism.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ValidationError};
use crate::domain::webhook::HandlerOutcome;

/// Outcome stored for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    Applied,
    Skipped,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Applied => "applied",
            LedgerStatus::Skipped => "skipped",
            LedgerStatus::Failed => "failed",
        }
    }

    /// Settled events are not re-run on redelivery.
    pub fn is_settled(&self) -> bool {
        !matches!(self, LedgerStatus::Failed)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(LedgerStatus::Applied),
            "skipped" => Ok(LedgerStatus::Skipped),
            "failed" => Ok(LedgerStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "webhook_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Stripe event ID (evt_xxx format).
    pub event_id: String,

    /// Type of Stripe event (e.g., "checkout.session.completed").
    pub event_type: String,

    pub status: LedgerStatus,

    /// Applied summary, skip reason, or failure reason.
    pub detail: Option<String>,

    /// Original event payload for debugging and replay.
    pub payload: serde_json::Value,

    /// Number of deliveries that ran a handler.
    pub attempts: i32,

    pub processed_at: DateTime<Utc>,
}

impl WebhookEventRecord {
    /// Builds the record for a handler outcome.
    pub fn from_outcome(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        outcome: &HandlerOutcome,
        payload: serde_json::Value,
    ) -> Self {
        let status = match outcome {
            HandlerOutcome::Applied(_) => LedgerStatus::Applied,
            HandlerOutcome::Skipped(_) => LedgerStatus::Skipped,
            HandlerOutcome::Failed(_) => LedgerStatus::Failed,
        };
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            status,
            detail: Some(outcome.detail().to_string()),
            payload,
            attempts: 1,
            processed_at: Utc::now(),
        }
    }

    pub fn with_attempts(mut self, attempts: i32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Port for storing and retrieving processed webhook events.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously processed event by its Stripe event ID.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Insert the record, or overwrite the existing one for its event id.
    async fn record(&self, record: WebhookEventRecord) -> Result<(), DomainError>;

    /// Delete records older than the specified timestamp.
    ///
    /// Returns the number of records deleted.
    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError>;
}
