//! PostgreSQL implementation of AccountRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::billing::{normalize_email, Account, Role};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::{AccountRepository, InsertResult};

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    role: String,
    email: String,
    full_name: Option<String>,
    phone: Option<String>,
    coach_id: Option<Uuid>,
    onboarding_required: bool,
    payout_account_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid role value: {}", e))
        })?;

        Ok(Account {
            id: AccountId::from_uuid(row.id),
            role,
            email: row.email,
            full_name: row.full_name,
            phone: row.phone,
            coach_id: row.coach_id.map(AccountId::from_uuid),
            onboarding_required: row.onboarding_required,
            payout_account_id: row.payout_account_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, role, email, full_name, phone, coach_id, onboarding_required,
           payout_account_id, created_at, updated_at
    FROM accounts
"#;

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ACCOUNT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("find account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn insert_if_absent(&self, account: &Account) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, role, email, full_name, phone, coach_id, onboarding_required,
                payout_account_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.role.as_str())
        .bind(normalize_email(&account.email))
        .bind(&account.full_name)
        .bind(&account.phone)
        .bind(account.coach_id.map(|id| *id.as_uuid()))
        .bind(account.onboarding_required)
        .bind(&account.payout_account_id)
        .bind(account.created_at.as_datetime())
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("insert account", e))?;

        Ok(InsertResult::from_rows_affected(result.rows_affected()))
    }
}
