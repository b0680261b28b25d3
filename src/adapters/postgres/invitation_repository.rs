//! PostgreSQL implementation of InvitationRepository.
//!
//! Consumption is a conditional update, so concurrent checkouts carrying
//! the same token complete the invitation exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::billing::{ConsumeOutcome, Invitation, InvitationStatus};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, InvitationId, Timestamp};
use crate::ports::InvitationRepository;

pub struct PostgresInvitationRepository {
    pool: PgPool,
}

impl PostgresInvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvitationRow {
    id: Uuid,
    token: String,
    coach_id: Uuid,
    student_email: String,
    student_name: Option<String>,
    payment_due_day: Option<i16>,
    expires_at: DateTime<Utc>,
    status: String,
    completed_at: Option<DateTime<Utc>>,
    student_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = DomainError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        let status: InvitationStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid invitation status: {}", e))
        })?;
        let payment_due_day = row
            .payment_due_day
            .map(u8::try_from)
            .transpose()
            .map_err(|_| DomainError::new(ErrorCode::DatabaseError, "Invalid payment due day"))?;

        Ok(Invitation {
            id: InvitationId::from_uuid(row.id),
            token: row.token,
            coach_id: AccountId::from_uuid(row.coach_id),
            student_email: row.student_email,
            student_name: row.student_name,
            payment_due_day,
            expires_at: Timestamp::from_datetime(row.expires_at),
            status,
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            student_id: row.student_id.map(AccountId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, DomainError> {
        let row: Option<InvitationRow> = sqlx::query_as(
            r#"
            SELECT id, token, coach_id, student_email, student_name, payment_due_day,
                   expires_at, status, completed_at, student_id, created_at
            FROM invitations
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find invitation", e))?;

        row.map(Invitation::try_from).transpose()
    }

    async fn consume(
        &self,
        token: &str,
        student_id: &AccountId,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations SET
                status = 'completed',
                completed_at = $3,
                student_id = $2
            WHERE token = $1 AND status = 'pending'
            "#,
        )
        .bind(token)
        .bind(student_id.as_uuid())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("consume invitation", e))?;

        if result.rows_affected() > 0 {
            return Ok(ConsumeOutcome::Consumed);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM invitations WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("find invitation", e))?;

        Ok(match exists {
            Some(_) => ConsumeOutcome::AlreadyConsumed,
            None => ConsumeOutcome::NotFound,
        })
    }
}
