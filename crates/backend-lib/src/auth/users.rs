//! Credential lookup.
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::UserSeed;
use crate::error::AppError;

/// An account as seen by authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    /// PHC string owned by the password encoder
    pub password_hash: String,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Resolves a username to a principal. `Ok(None)` means the account does not exist.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<Option<Principal>, AppError>;
}

/// Accounts held in memory, seeded from configuration
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, Principal>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[UserSeed]) -> Self {
        let store = Self::new();
        for seed in seeds {
            store.insert(&seed.username, &seed.password_hash);
        }
        store
    }

    /// Add or replace an account
    pub fn insert(&self, username: &str, password_hash: &str) {
        self.users.insert(
            username.to_string(),
            Principal {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
    }

    pub fn remove(&self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialLookup for InMemoryUserStore {
    async fn lookup(&self, username: &str) -> Result<Option<Principal>, AppError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }
}
