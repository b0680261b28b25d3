//! Webhook processor - ledger-backed handling of verified events.
//!
//! The processor follows these steps:
//! 1. Look the event id up in the webhook ledger
//! 2. Short-circuit settled events (applied or skipped)
//! 3. Route the event to its handler
//! 4. Record the outcome, overwriting an earlier failed attempt
//!
//! Handlers are idempotent on their own. Two concurrent deliveries of the
//! same event may both run; the ledger only saves repeated work.

use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;

use super::event_router::EventRouter;
use crate::domain::webhook::{HandlerOutcome, StripeEvent, StripeWebhookVerifier, WebhookError};
use crate::ports::{LedgerStatus, WebhookEventRecord, WebhookEventRepository};

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// A handler ran.
    Handled(HandlerOutcome),
    /// A settled ledger record already exists for the event id.
    AlreadyProcessed(LedgerStatus),
}

impl ProcessResult {
    pub fn outcome_str(&self) -> &'static str {
        match self {
            ProcessResult::Handled(outcome) => outcome.as_str(),
            ProcessResult::AlreadyProcessed(_) => "already_processed",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ProcessResult::Handled(outcome) => outcome.detail().to_string(),
            ProcessResult::AlreadyProcessed(status) => format!("previously {}", status),
        }
    }
}

pub struct WebhookProcessor {
    ledger: Arc<dyn WebhookEventRepository>,
    router: EventRouter,
}

impl WebhookProcessor {
    pub fn new(ledger: Arc<dyn WebhookEventRepository>, router: EventRouter) -> Self {
        Self { ledger, router }
    }

    /// Runs the event through its handler unless already settled.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures escape. The failed attempt is still
    /// recorded when the ledger is reachable.
    pub async fn process(&self, event: StripeEvent) -> Result<ProcessResult, WebhookError> {
        let previous = self.ledger.find_by_event_id(&event.id).await?;
        if let Some(record) = &previous {
            if record.status.is_settled() {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    status = %record.status,
                    "Webhook already processed"
                );
                return Ok(ProcessResult::AlreadyProcessed(record.status));
            }
        }
        let attempts = previous.map(|r| r.attempts + 1).unwrap_or(1);
        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);

        match self.router.route(&event).await {
            Ok(outcome) => {
                log_outcome(&event, &outcome);
                let record =
                    WebhookEventRecord::from_outcome(&event.id, &event.event_type, &outcome, payload)
                        .with_attempts(attempts);
                self.ledger.record(record).await?;
                Ok(ProcessResult::Handled(outcome))
            }
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    attempts,
                    error = %e,
                    "Webhook processing error; Stripe will retry"
                );
                let failure = HandlerOutcome::failed(e.to_string());
                let record =
                    WebhookEventRecord::from_outcome(&event.id, &event.event_type, &failure, payload)
                        .with_attempts(attempts);
                if let Err(record_err) = self.ledger.record(record).await {
                    tracing::warn!(
                        event_id = %event.id,
                        error = %record_err,
                        "Failed to record webhook failure"
                    );
                }
                Err(e)
            }
        }
    }
}

fn log_outcome(event: &StripeEvent, outcome: &HandlerOutcome) {
    match outcome {
        HandlerOutcome::Applied(summary) => tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            summary = %summary,
            "Webhook applied"
        ),
        HandlerOutcome::Skipped(reason) => tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            reason = %reason,
            "Webhook skipped"
        ),
        HandlerOutcome::Failed(reason) => tracing::error!(
            event_id = %event.id,
            event_type = %event.event_type,
            reason = %reason,
            "Webhook failed; acknowledged without retry"
        ),
    }
}

/// Acknowledgement body returned to Stripe.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub event_id: String,
    pub event_type: String,
    pub outcome: &'static str,
    pub detail: String,
}

/// Verification plus processing: the unit the HTTP endpoint calls.
pub struct WebhookService {
    verifier: Option<StripeWebhookVerifier>,
    processor: WebhookProcessor,
}

impl WebhookService {
    pub fn new(webhook_secret: Option<SecretString>, processor: WebhookProcessor) -> Self {
        Self {
            verifier: webhook_secret.map(StripeWebhookVerifier::new),
            processor,
        }
    }

    /// Verifies and processes one delivery.
    ///
    /// Nothing runs unless the signature checks out against the configured
    /// secret.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, WebhookError> {
        let verifier = self.verifier.as_ref().ok_or(WebhookError::MissingSecret)?;
        let signature = signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let event = verifier.verify_and_parse(payload, signature)?;
        let event_id = event.id.clone();
        let event_type = event.event_type.clone();

        let result = self.processor.process(event).await?;

        Ok(WebhookAck {
            received: true,
            event_id,
            event_type,
            outcome: result.outcome_str(),
            detail: result.detail(),
        })
    }
}
