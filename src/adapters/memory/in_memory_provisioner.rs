//! In-memory identity provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::billing::normalize_email;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::{AccountProvisioner, Identity, NewIdentity};

#[derive(Default)]
struct ProvisionerState {
    identities: HashMap<String, Identity>,
    created: Vec<NewIdentity>,
    activation_links: Vec<String>,
    fail_create: bool,
}

/// Identity provider double keyed by normalized email.
#[derive(Clone, Default)]
pub struct InMemoryAccountProvisioner {
    state: Arc<Mutex<ProvisionerState>>,
}

impl InMemoryAccountProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProvisionerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a pre-existing identity and returns it.
    pub fn with_identity(&self, email: &str) -> Identity {
        let identity = Identity {
            id: AccountId::new(),
            email: normalize_email(email),
        };
        self.lock()
            .identities
            .insert(identity.email.clone(), identity.clone());
        identity
    }

    /// Makes `create_identity` fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Identities created through the port.
    pub fn created(&self) -> Vec<NewIdentity> {
        self.lock().created.clone()
    }

    pub fn activation_links(&self) -> Vec<String> {
        self.lock().activation_links.clone()
    }
}

#[async_trait]
impl AccountProvisioner for InMemoryAccountProvisioner {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError> {
        Ok(self.lock().identities.get(&normalize_email(email)).cloned())
    }

    async fn create_identity(&self, new: &NewIdentity) -> Result<Identity, DomainError> {
        let mut state = self.lock();
        if state.fail_create {
            return Err(DomainError::external("identity", "simulated provisioning failure"));
        }
        let email = normalize_email(&new.email);
        if state.identities.contains_key(&email) {
            return Err(DomainError::new(ErrorCode::AccountExists, "Email already registered"));
        }
        let identity = Identity {
            id: AccountId::new(),
            email: email.clone(),
        };
        state.identities.insert(email, identity.clone());
        state.created.push(new.clone());
        Ok(identity)
    }

    async fn generate_activation_link(&self, email: &str) -> Result<String, DomainError> {
        let link = format!(
            "https://app.test/activate?email={}",
            normalize_email(email)
        );
        self.lock().activation_links.push(link.clone());
        Ok(link)
    }
}
