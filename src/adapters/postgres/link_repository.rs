//! PostgreSQL implementation of CoachStudentLinkRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::database_error;
use crate::domain::billing::CoachStudentLink;
use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::ports::{CoachStudentLinkRepository, InsertResult};

pub struct PostgresLinkRepository {
    pool: PgPool,
}

impl PostgresLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoachStudentLinkRepository for PostgresLinkRepository {
    async fn insert_if_absent(&self, link: &CoachStudentLink) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO coach_student_links (coach_id, student_id, active, created_at, deactivated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (coach_id, student_id) DO NOTHING
            "#,
        )
        .bind(link.coach_id.as_uuid())
        .bind(link.student_id.as_uuid())
        .bind(link.active)
        .bind(link.created_at.as_datetime())
        .bind(link.deactivated_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("insert link", e))?;

        Ok(InsertResult::from_rows_affected(result.rows_affected()))
    }

    async fn deactivate(
        &self,
        coach_id: &AccountId,
        student_id: &AccountId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE coach_student_links SET active = FALSE, deactivated_at = $3
            WHERE coach_id = $1 AND student_id = $2 AND active
            "#,
        )
        .bind(coach_id.as_uuid())
        .bind(student_id.as_uuid())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("deactivate link", e))?;

        Ok(result.rows_affected() > 0)
    }
}
