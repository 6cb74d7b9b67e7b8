// ============================
// formguard-backend-lib/src/lib.rs
// ============================
//! Core functionality for the `formguard` authentication server: form
//! login, persistent remember-me tokens, sessions and the path policy
//! that decides which requests need a principal.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::cookie::CookieOptions;
use crate::auth::{
    AuthOptions, AuthService, AuthorizationPolicy, CredentialLookup, DefaultAuth,
    DelegatingPasswordEncoder, InMemoryUserStore, PasswordVerifier, PersistentTokenStore,
    SessionManager,
};
use crate::config::{Settings, TokenStoreKind};
use crate::error::AppError;
use crate::storage::{FlatFileTokenRepository, InMemoryTokenRepository, TokenRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Per-request decision engine
    pub auth: Arc<dyn AuthService>,
    /// Session manager
    pub sessions: SessionManager,
    /// Remember-me token store
    pub tokens: Arc<PersistentTokenStore>,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the state from settings: users seeded from config, the
    /// delegating password encoder, and the configured token repository
    pub async fn new(settings: Settings) -> Result<Self, AppError> {
        let repo: Arc<dyn TokenRepository> = match settings.remember_me.store {
            TokenStoreKind::Memory => Arc::new(InMemoryTokenRepository::new()),
            TokenStoreKind::File => {
                Arc::new(FlatFileTokenRepository::open(&settings.server.data_dir).await?)
            },
        };
        let users = Arc::new(InMemoryUserStore::from_seeds(&settings.users));
        if users.is_empty() {
            tracing::warn!("no users configured; every login will fail");
        }

        Self::with_components(
            settings,
            users,
            Arc::new(DelegatingPasswordEncoder::default()),
            repo,
        )
    }

    /// Build the state around caller-supplied collaborators
    pub fn with_components(
        settings: Settings,
        users: Arc<dyn CredentialLookup>,
        verifier: Arc<dyn PasswordVerifier>,
        repo: Arc<dyn TokenRepository>,
    ) -> Result<Self, AppError> {
        settings.validate()?;

        let security = &settings.security;
        let policy = AuthorizationPolicy::new(&security.public_patterns, security.protected_default)?;
        let sessions =
            SessionManager::new(security.session_idle_ttl(), security.session_absolute_ttl());
        let tokens = Arc::new(PersistentTokenStore::new(
            repo,
            users.clone(),
            &settings.remember_me,
        ));
        let options = AuthOptions {
            reveal_user_not_found: security.reveal_user_not_found,
            csrf_enabled: security.csrf_enabled,
        };

        let auth = Arc::new(DefaultAuth::new(
            policy,
            users,
            verifier,
            sessions.clone(),
            tokens.clone(),
            options,
        ));

        Ok(Self {
            auth,
            sessions,
            tokens,
            settings: Arc::new(settings),
        })
    }

    /// Attributes applied to every cookie the server sets
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            secure: self.settings.security.cookie_secure,
        }
    }
}
