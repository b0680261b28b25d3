//! AccountProvisioner port - authentication identities.
//!
//! The identity provider owns credentials. This service only looks
//! identities up, creates them for guest checkouts, and asks for an
//! activation link the new user follows to set a password.

use async_trait::async_trait;

use crate::domain::billing::Role;
use crate::domain::foundation::{AccountId, DomainError};

/// An authentication identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: AccountId,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Find an identity by email.
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError>;

    /// Create an identity with an unset password.
    ///
    /// # Errors
    ///
    /// - `AccountExists` if the email is already registered
    /// - `ExternalServiceError` if the provider call fails
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, DomainError>;

    /// Generate a one-time link that lets the user set a password.
    async fn generate_activation_link(&self, email: &str) -> Result<String, DomainError>;
}
