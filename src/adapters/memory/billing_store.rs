//! In-memory persisted state store.
//!
//! Implements every repository port over one mutex-guarded state, so each
//! operation is atomic the way a single SQL statement is. Used by unit and
//! integration tests and for running the service without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::billing::{
    normalize_email, Account, CoachStudentLink, ConsumeOutcome, Invitation, Payment, Subscription,
};
use crate::domain::foundation::{
    AccountId, DomainError, ErrorCode, PaymentId, SubscriptionId, Timestamp,
};
use crate::ports::{
    AccountRepository, CoachStudentLinkRepository, InsertResult, InvitationRepository,
    PaymentRepository, SubscriptionRepository, WebhookEventRecord, WebhookEventRepository,
};

#[derive(Default)]
struct StoreState {
    accounts: HashMap<AccountId, Account>,
    invitations: HashMap<String, Invitation>,
    subscriptions: HashMap<String, Subscription>,
    payments: Vec<Payment>,
    links: HashMap<(AccountId, AccountId), CoachStudentLink>,
    webhook_events: HashMap<String, WebhookEventRecord>,
    unavailable: bool,
}

/// In-memory implementation of all state store ports.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means a test panicked mid-operation; the data
    /// is still usable.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Locks the state, failing like a dropped database connection while
    /// the store is marked unavailable.
    fn available(&self) -> Result<MutexGuard<'_, StoreState>, DomainError> {
        let guard = self.lock();
        if guard.unavailable {
            return Err(DomainError::database("in-memory store unavailable"));
        }
        Ok(guard)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    /// Makes every subsequent operation fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn put_account(&self, account: Account) {
        self.lock().accounts.insert(account.id, account);
    }

    pub fn put_invitation(&self, invitation: Invitation) {
        self.lock()
            .invitations
            .insert(invitation.token.clone(), invitation);
    }

    pub fn put_subscription(&self, subscription: Subscription) {
        self.lock()
            .subscriptions
            .insert(subscription.external_id.clone(), subscription);
    }

    pub fn put_payment(&self, payment: Payment) {
        self.lock().payments.push(payment);
    }

    pub fn put_link(&self, link: CoachStudentLink) {
        self.lock()
            .links
            .insert((link.coach_id, link.student_id), link);
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.lock().accounts.values().cloned().collect()
    }

    pub fn accounts_with_email(&self, email: &str) -> Vec<Account> {
        let email = normalize_email(email);
        self.lock()
            .accounts
            .values()
            .filter(|a| a.email == email)
            .cloned()
            .collect()
    }

    pub fn invitation(&self, token: &str) -> Option<Invitation> {
        self.lock().invitations.get(token).cloned()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.lock().subscriptions.values().cloned().collect()
    }

    pub fn subscription(&self, external_id: &str) -> Option<Subscription> {
        self.lock().subscriptions.get(external_id).cloned()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.lock().payments.clone()
    }

    pub fn link(&self, coach_id: &AccountId, student_id: &AccountId) -> Option<CoachStudentLink> {
        self.lock().links.get(&(*coach_id, *student_id)).cloned()
    }

    pub fn links(&self) -> Vec<CoachStudentLink> {
        self.lock().links.values().cloned().collect()
    }

    pub fn webhook_record(&self, event_id: &str) -> Option<WebhookEventRecord> {
        self.lock().webhook_events.get(event_id).cloned()
    }

    pub fn webhook_record_count(&self) -> usize {
        self.lock().webhook_events.len()
    }
}

#[async_trait]
impl AccountRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        Ok(self.available()?.accounts.get(id).cloned())
    }

    async fn insert_if_absent(&self, account: &Account) -> Result<InsertResult, DomainError> {
        let mut state = self.available()?;
        let email = normalize_email(&account.email);
        let exists = state.accounts.contains_key(&account.id)
            || state.accounts.values().any(|a| a.email == email);
        if exists {
            return Ok(InsertResult::AlreadyExists);
        }
        let mut stored = account.clone();
        stored.email = email;
        state.accounts.insert(stored.id, stored);
        Ok(InsertResult::Inserted)
    }
}

#[async_trait]
impl InvitationRepository for InMemoryBillingStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, DomainError> {
        Ok(self.available()?.invitations.get(token).cloned())
    }

    async fn consume(
        &self,
        token: &str,
        student_id: &AccountId,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, DomainError> {
        let mut state = self.available()?;
        Ok(match state.invitations.get_mut(token) {
            Some(invitation) => invitation.consume(*student_id, now),
            None => ConsumeOutcome::NotFound,
        })
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .available()?
            .subscriptions
            .values()
            .find(|s| &s.id == id)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.available()?.subscriptions.get(external_id).cloned())
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let mut state = self.available()?;
        let mut stored = subscription.clone();
        if let Some(existing) = state.subscriptions.get(&subscription.external_id) {
            stored.id = existing.id;
            stored.created_at = existing.created_at;
        }
        state
            .subscriptions
            .insert(stored.external_id.clone(), stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
    async fn insert_if_absent(&self, payment: &Payment) -> Result<InsertResult, DomainError> {
        let mut state = self.available()?;
        let duplicate = payment.invoice_id.is_some()
            && state
                .payments
                .iter()
                .any(|p| p.invoice_id == payment.invoice_id);
        if duplicate {
            return Ok(InsertResult::AlreadyExists);
        }
        state.payments.push(payment.clone());
        Ok(InsertResult::Inserted)
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .available()?
            .payments
            .iter()
            .find(|p| p.invoice_id.as_deref() == Some(invoice_id))
            .cloned())
    }

    async fn find_by_payment_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .available()?
            .payments
            .iter()
            .find(|p| p.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }

    async fn find_by_charge_id(&self, charge_id: &str) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .available()?
            .payments
            .iter()
            .find(|p| p.charge_id.as_deref() == Some(charge_id))
            .cloned())
    }

    async fn mark_refunded(
        &self,
        id: &PaymentId,
        refunded_amount_cents: i64,
        refunded_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut state = self.available()?;
        let payment = state
            .payments
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "Payment not found"))?;
        payment.mark_refunded(refunded_amount_cents, refunded_at);
        Ok(())
    }
}

#[async_trait]
impl CoachStudentLinkRepository for InMemoryBillingStore {
    async fn insert_if_absent(&self, link: &CoachStudentLink) -> Result<InsertResult, DomainError> {
        let mut state = self.available()?;
        let key = (link.coach_id, link.student_id);
        if state.links.contains_key(&key) {
            return Ok(InsertResult::AlreadyExists);
        }
        state.links.insert(key, link.clone());
        Ok(InsertResult::Inserted)
    }

    async fn deactivate(
        &self,
        coach_id: &AccountId,
        student_id: &AccountId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut state = self.available()?;
        Ok(match state.links.get_mut(&(*coach_id, *student_id)) {
            Some(link) if link.active => {
                link.deactivate(now);
                true
            }
            _ => false,
        })
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryBillingStore {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.available()?.webhook_events.get(event_id).cloned())
    }

    async fn record(&self, record: WebhookEventRecord) -> Result<(), DomainError> {
        self.available()?
            .webhook_events
            .insert(record.event_id.clone(), record);
        Ok(())
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut state = self.available()?;
        let before = state.webhook_events.len();
        state
            .webhook_events
            .retain(|_, r| r.processed_at >= timestamp);
        Ok((before - state.webhook_events.len()) as u64)
    }
}
