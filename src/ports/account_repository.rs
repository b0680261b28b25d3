//! AccountRepository port - platform profiles for coaches and students.

use async_trait::async_trait;

use super::InsertResult;
use crate::domain::billing::Account;
use crate::domain::foundation::{AccountId, DomainError};

/// Repository port for account profiles.
///
/// Implementations must enforce unique `id` and unique (normalized) `email`.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by id.
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError>;

    /// Insert a profile unless one already exists for its id or email.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert_if_absent(&self, account: &Account) -> Result<InsertResult, DomainError>;
}
