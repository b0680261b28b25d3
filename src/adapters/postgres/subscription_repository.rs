//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    external_id: String,
    coach_id: Uuid,
    student_id: Uuid,
    price_id: Option<String>,
    amount_cents: i64,
    currency: String,
    billing_interval: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    canceled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    trial_start: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: SubscriptionStatus = row.status.parse().map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid subscription status: {}", e),
            )
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            external_id: row.external_id,
            coach_id: AccountId::from_uuid(row.coach_id),
            student_id: AccountId::from_uuid(row.student_id),
            price_id: row.price_id,
            amount_cents: row.amount_cents,
            currency: row.currency,
            interval: row.billing_interval,
            status,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            cancellation_reason: row.cancellation_reason,
            trial_start: row.trial_start.map(Timestamp::from_datetime),
            trial_end: row.trial_end.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, external_id, coach_id, student_id, price_id, amount_cents, currency,
    billing_interval, status, current_period_start, current_period_end,
    cancel_at_period_end, canceled_at, cancellation_reason, trial_start, trial_end,
    created_at, updated_at
"#;

fn datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE external_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        // The stored id and created_at win over the incoming ones.
        let row: SubscriptionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO subscriptions ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (external_id) DO UPDATE SET
                coach_id = EXCLUDED.coach_id,
                student_id = EXCLUDED.student_id,
                price_id = EXCLUDED.price_id,
                amount_cents = EXCLUDED.amount_cents,
                currency = EXCLUDED.currency,
                billing_interval = EXCLUDED.billing_interval,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                canceled_at = EXCLUDED.canceled_at,
                cancellation_reason = EXCLUDED.cancellation_reason,
                trial_start = EXCLUDED.trial_start,
                trial_end = EXCLUDED.trial_end,
                updated_at = EXCLUDED.updated_at
            RETURNING {columns}
            "#,
            columns = SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription.id.as_uuid())
        .bind(&subscription.external_id)
        .bind(subscription.coach_id.as_uuid())
        .bind(subscription.student_id.as_uuid())
        .bind(&subscription.price_id)
        .bind(subscription.amount_cents)
        .bind(&subscription.currency)
        .bind(&subscription.interval)
        .bind(subscription.status.as_str())
        .bind(datetime(subscription.current_period_start))
        .bind(datetime(subscription.current_period_end))
        .bind(subscription.cancel_at_period_end)
        .bind(datetime(subscription.canceled_at))
        .bind(&subscription.cancellation_reason)
        .bind(datetime(subscription.trial_start))
        .bind(datetime(subscription.trial_end))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("upsert subscription", e))?;

        Subscription::try_from(row)
    }
}
