//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::billing::{Payment, PaymentStatus};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, PaymentId, SubscriptionId, Timestamp,
};
use crate::ports::{InsertResult, PaymentRepository};

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Payment>, DomainError> {
        // `column` is one of the fixed key columns below, never user input.
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE {} = $1 ORDER BY created_at LIMIT 1",
            PAYMENT_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find payment", e))?;

        row.map(Payment::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    invoice_id: Option<String>,
    payment_intent_id: Option<String>,
    charge_id: Option<String>,
    subscription_id: Option<Uuid>,
    external_subscription_id: Option<String>,
    coach_id: Uuid,
    student_id: Uuid,
    amount_cents: i64,
    platform_fee_cents: i64,
    coach_amount_cents: i64,
    processor_fee_cents: i64,
    currency: String,
    status: String,
    refunded_amount_cents: i64,
    refunded_at: Option<DateTime<Utc>>,
    paid_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid payment status: {}", e))
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            invoice_id: row.invoice_id,
            payment_intent_id: row.payment_intent_id,
            charge_id: row.charge_id,
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            external_subscription_id: row.external_subscription_id,
            coach_id: AccountId::from_uuid(row.coach_id),
            student_id: AccountId::from_uuid(row.student_id),
            amount_cents: row.amount_cents,
            platform_fee_cents: row.platform_fee_cents,
            coach_amount_cents: row.coach_amount_cents,
            processor_fee_cents: row.processor_fee_cents,
            currency: row.currency,
            status,
            refunded_amount_cents: row.refunded_amount_cents,
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            paid_at: Timestamp::from_datetime(row.paid_at),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const PAYMENT_COLUMNS: &str = r#"
    id, invoice_id, payment_intent_id, charge_id, subscription_id,
    external_subscription_id, coach_id, student_id, amount_cents, platform_fee_cents,
    coach_amount_cents, processor_fee_cents, currency, status, refunded_amount_cents,
    refunded_at, paid_at, created_at
"#;

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert_if_absent(&self, payment: &Payment) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO payments ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (invoice_id) DO NOTHING
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(payment.id.as_uuid())
        .bind(&payment.invoice_id)
        .bind(&payment.payment_intent_id)
        .bind(&payment.charge_id)
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(&payment.external_subscription_id)
        .bind(payment.coach_id.as_uuid())
        .bind(payment.student_id.as_uuid())
        .bind(payment.amount_cents)
        .bind(payment.platform_fee_cents)
        .bind(payment.coach_amount_cents)
        .bind(payment.processor_fee_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.refunded_amount_cents)
        .bind(payment.refunded_at.map(|t| *t.as_datetime()))
        .bind(payment.paid_at.as_datetime())
        .bind(payment.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("insert payment", e))?;

        Ok(InsertResult::from_rows_affected(result.rows_affected()))
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, DomainError> {
        self.find_one("invoice_id", invoice_id).await
    }

    async fn find_by_payment_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        self.find_one("payment_intent_id", payment_intent_id).await
    }

    async fn find_by_charge_id(&self, charge_id: &str) -> Result<Option<Payment>, DomainError> {
        self.find_one("charge_id", charge_id).await
    }

    async fn mark_refunded(
        &self,
        id: &PaymentId,
        refunded_amount_cents: i64,
        refunded_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = 'refunded',
                refunded_amount_cents = LEAST(GREATEST($2, 0), amount_cents),
                refunded_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(refunded_amount_cents)
        .bind(refunded_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("mark payment refunded", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::PaymentNotFound, "Payment not found"));
        }

        Ok(())
    }
}
