// =============
// crates/backend-lib/src/auth/service.rs
// =============
//! This module defines the `AuthService` trait, the per-request decision
//! contract used by the HTTP layer.
use async_trait::async_trait;
use formguard_common::LoginForm;

use super::remember_me::RememberMeToken;
use super::session::Session;
use crate::error::AppError;

/// Credentials a request carries in its cookies
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub session_id: Option<String>,
    pub remember_me: Option<String>,
}

/// Why a request is sent to the login entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeReason {
    /// No session and no usable remember-me cookie
    Unauthenticated,
    /// A session cookie was presented but the session is gone
    SessionExpired,
}

/// Identity established during this request from a remember-me cookie
#[derive(Debug, Clone)]
pub struct Established {
    /// Rotated token the client must store
    pub remember_me: RememberMeToken,
}

/// Outcome of evaluating one request
#[derive(Debug, Clone)]
pub enum Decision {
    /// Public path; no credential was looked at
    Allow,
    /// A live session or a valid remember-me token identifies the caller
    Authenticated {
        session: Session,
        /// Set when the session was created from a remember-me cookie
        established: Option<Established>,
    },
    /// Redirect to login
    Challenge {
        reason: ChallengeReason,
        /// The client's remember-me cookie was refused and should be removed
        clear_remember_me: bool,
    },
}

/// Result of a successful form login
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub session: Session,
    /// Present when remember-me was requested and could be persisted
    pub remember_me: Option<RememberMeToken>,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Evaluate a request for `path`
    async fn decide(&self, path: &str, credentials: &Credentials) -> Result<Decision, AppError>;

    /// Handle a login form submission, replacing `previous_session` if given
    async fn login(
        &self,
        form: LoginForm,
        previous_session: Option<&str>,
    ) -> Result<LoginSuccess, AppError>;

    /// End the session and revoke the remember-me series bound to this device
    async fn logout(&self, credentials: &Credentials) -> Result<(), AppError>;

    /// Look up a live session without refreshing it
    async fn session(&self, session_id: &str) -> Option<Session>;

    /// Check a state-changing request's CSRF token
    fn check_csrf(&self, session: Option<&Session>, presented: Option<&str>)
        -> Result<(), AppError>;
}
