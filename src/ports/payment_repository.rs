//! PaymentRepository port - the payment ledger.

use async_trait::async_trait;

use super::InsertResult;
use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, PaymentId, Timestamp};

/// Repository port for recorded payments.
///
/// `invoice_id` is a natural unique key. Payments are created once and
/// only ever mutated to add refund information.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment unless one already exists for its invoice id.
    async fn insert_if_absent(&self, payment: &Payment) -> Result<InsertResult, DomainError>;

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, DomainError>;

    async fn find_by_payment_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    async fn find_by_charge_id(&self, charge_id: &str) -> Result<Option<Payment>, DomainError>;

    /// Set status `refunded` with the refunded amount and time.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if no payment has this id
    /// - `DatabaseError` on persistence failure
    async fn mark_refunded(
        &self,
        id: &PaymentId,
        refunded_amount_cents: i64,
        refunded_at: Timestamp,
    ) -> Result<(), DomainError>;
}
