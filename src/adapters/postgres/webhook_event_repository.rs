//! PostgreSQL implementation of WebhookEventRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::database_error;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{LedgerStatus, WebhookEventRecord, WebhookEventRepository};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    status: String,
    detail: Option<String>,
    payload: serde_json::Value,
    attempts: i32,
    processed_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let status: LedgerStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid webhook status: {}", e))
        })?;

        Ok(WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            status,
            detail: row.detail,
            payload: row.payload,
            attempts: row.attempts,
            processed_at: row.processed_at,
        })
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, status, detail, payload, attempts, processed_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn record(&self, record: WebhookEventRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, status, detail, payload, attempts, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id) DO UPDATE SET
                status = EXCLUDED.status,
                detail = EXCLUDED.detail,
                payload = EXCLUDED.payload,
                attempts = EXCLUDED.attempts,
                processed_at = EXCLUDED.processed_at
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.status.as_str())
        .bind(&record.detail)
        .bind(&record.payload)
        .bind(record.attempts)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("record webhook event", e))?;

        Ok(())
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE processed_at < $1")
            .bind(timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("prune webhook events", e))?;

        Ok(result.rows_affected())
    }
}
