use async_trait::async_trait;
use formguard_common::LoginForm;
use metrics::counter;
use std::sync::Arc;
use zeroize::Zeroize;

use super::cookie::decode_remember_me;
use super::password::{PasswordVerifier, DUMMY_PASSWORD_HASH};
use super::policy::AuthorizationPolicy;
use super::remember_me::PersistentTokenStore;
use super::service::{
    AuthService, ChallengeReason, Credentials, Decision, Established, LoginSuccess,
};
use super::session::{Session, SessionManager};
use super::users::CredentialLookup;
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILURE, LOGIN_SUCCESS, LOGOUT};
use crate::storage::constant_time_eq;
use crate::validation::validate_login_form;

/// Behaviour switches taken from `SecuritySettings`
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthOptions {
    /// Report unknown usernames as `UserNotFound` instead of `InvalidCredentials`
    pub reveal_user_not_found: bool,
    pub csrf_enabled: bool,
}

pub struct DefaultAuth {
    policy: AuthorizationPolicy,
    users: Arc<dyn CredentialLookup>,
    verifier: Arc<dyn PasswordVerifier>,
    sessions: SessionManager,
    tokens: Arc<PersistentTokenStore>,
    options: AuthOptions,
}

impl DefaultAuth {
    pub fn new(
        policy: AuthorizationPolicy,
        users: Arc<dyn CredentialLookup>,
        verifier: Arc<dyn PasswordVerifier>,
        sessions: SessionManager,
        tokens: Arc<PersistentTokenStore>,
        options: AuthOptions,
    ) -> Self {
        Self {
            policy,
            users,
            verifier,
            sessions,
            tokens,
            options,
        }
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    /// Hash comparison on the blocking pool; the plaintext is wiped there
    async fn verify_password(
        &self,
        mut password: String,
        password_hash: String,
    ) -> Result<bool, AppError> {
        let verifier = self.verifier.clone();
        tokio::task::spawn_blocking(move || {
            let verified = verifier.verify(&password, &password_hash);
            password.zeroize();
            verified
        })
        .await
        .map_err(|err| AppError::Internal(format!("password verification task failed: {err}")))
    }

    fn login_failed(&self, username: &str, err: AppError) -> AppError {
        counter!(LOGIN_FAILURE).increment(1);
        tracing::info!(username, reason = %err, "login failed");
        err
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn decide(&self, path: &str, credentials: &Credentials) -> Result<Decision, AppError> {
        if !self.policy.requires_authentication(path) {
            return Ok(Decision::Allow);
        }

        let mut session_expired = false;
        if let Some(id) = credentials.session_id.as_deref() {
            match self.sessions.touch(id).await {
                Some(session) => {
                    return Ok(Decision::Authenticated {
                        session,
                        established: None,
                    })
                },
                None => session_expired = true,
            }
        }

        let mut clear_remember_me = false;
        if let Some(cookie) = credentials.remember_me.as_deref() {
            match self.tokens.validate_cookie(cookie).await {
                Ok(login) => {
                    let session = self
                        .sessions
                        .create_session(
                            &login.principal.username,
                            Some(login.token.series.clone()),
                        )
                        .await;
                    tracing::info!(
                        username = %login.principal.username,
                        path,
                        "authenticated from remember-me cookie"
                    );
                    return Ok(Decision::Authenticated {
                        session,
                        established: Some(Established {
                            remember_me: login.token,
                        }),
                    });
                },
                Err(AppError::TokenRejected(_)) => clear_remember_me = true,
                Err(err) => return Err(err),
            }
        }

        let reason = if session_expired {
            ChallengeReason::SessionExpired
        } else {
            ChallengeReason::Unauthenticated
        };
        tracing::debug!(path, ?reason, "authentication required");
        Ok(Decision::Challenge {
            reason,
            clear_remember_me,
        })
    }

    async fn login(
        &self,
        mut form: LoginForm,
        previous_session: Option<&str>,
    ) -> Result<LoginSuccess, AppError> {
        let username = form.username.trim().to_string();
        if let Err(err) = validate_login_form(&form) {
            form.password.zeroize();
            return Err(self.login_failed(&username, err.into()));
        }

        let principal = match self.users.lookup(&username).await {
            Ok(found) => found,
            Err(err) => {
                form.password.zeroize();
                return Err(err);
            },
        };

        let password_hash = principal
            .as_ref()
            .map_or(DUMMY_PASSWORD_HASH, |principal| principal.password_hash.as_str())
            .to_string();
        let verified = self
            .verify_password(std::mem::take(&mut form.password), password_hash)
            .await?;

        let Some(principal) = principal else {
            let err = if self.options.reveal_user_not_found {
                AppError::UserNotFound
            } else {
                AppError::InvalidCredentials
            };
            return Err(self.login_failed(&username, err));
        };
        if !verified {
            return Err(self.login_failed(&username, AppError::InvalidCredentials));
        }

        // Never carry a pre-login session id across authentication
        if let Some(previous) = previous_session {
            self.sessions.invalidate(previous).await;
        }

        let remember_me = if form.remember_me {
            match self.tokens.issue(&principal.username).await {
                Ok(token) => Some(token),
                Err(err) => {
                    // The login itself stands; only the cookie is skipped
                    tracing::error!(
                        username = %principal.username,
                        error = %err,
                        "failed to persist remember-me token"
                    );
                    None
                },
            }
        } else {
            None
        };

        let session = self
            .sessions
            .create_session(
                &principal.username,
                remember_me.as_ref().map(|token| token.series.clone()),
            )
            .await;

        counter!(LOGIN_SUCCESS).increment(1);
        tracing::info!(
            username = %principal.username,
            remember_me = remember_me.is_some(),
            "login succeeded"
        );

        Ok(LoginSuccess {
            session,
            remember_me,
        })
    }

    async fn logout(&self, credentials: &Credentials) -> Result<(), AppError> {
        let mut series = Vec::new();
        let mut username = None;

        if let Some(id) = credentials.session_id.as_deref() {
            if let Some(session) = self.sessions.invalidate(id).await {
                series.extend(session.remember_me_series);
                username = Some(session.username);
            }
        }
        if let Some(cookie) = credentials.remember_me.as_deref() {
            if let Ok((cookie_series, _)) = decode_remember_me(cookie) {
                if !series.contains(&cookie_series) {
                    series.push(cookie_series);
                }
            }
        }

        for series in &series {
            self.tokens.revoke(series).await?;
        }

        counter!(LOGOUT).increment(1);
        tracing::info!(
            username = username.as_deref().unwrap_or("<anonymous>"),
            revoked = series.len(),
            "logout"
        );
        Ok(())
    }

    async fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).await
    }

    fn check_csrf(
        &self,
        session: Option<&Session>,
        presented: Option<&str>,
    ) -> Result<(), AppError> {
        if !self.options.csrf_enabled {
            return Ok(());
        }
        // Without a session there is nothing to protect
        let Some(session) = session else {
            return Ok(());
        };
        match presented {
            Some(token) if constant_time_eq(token.as_bytes(), session.csrf_token.as_bytes()) => {
                Ok(())
            },
            _ => {
                tracing::warn!(username = %session.username, "CSRF token rejected");
                Err(AppError::CsrfRejected)
            },
        }
    }
}
