// ============================
// crates/backend-lib/src/auth/remember_me.rs
// ============================
/** Persistent remember-me tokens
Each remembered device owns a `series` that never changes and a
`token_value` that is replaced on every successful use. Presenting a
value that has already been rotated away deletes the series, which is
how a stolen cookie gets noticed. */
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use formguard_common::PersistentLogin;
use metrics::counter;
use tokio::task::JoinHandle;

use super::cookie::{decode_remember_me, encode_remember_me};
use super::token_generator::random_token;
use super::users::{CredentialLookup, Principal};
use crate::config::RememberMeSettings;
use crate::error::{AppError, TokenRejection};
use crate::metrics::{
    REMEMBER_ME_ISSUED, REMEMBER_ME_REJECTED, REMEMBER_ME_ROTATED, REMEMBER_ME_SWEPT,
};
use crate::storage::{RotateOutcome, TokenRepository};

/// A remember-me credential as handed to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberMeToken {
    pub series: String,
    pub token_value: String,
    pub username: String,
    pub last_used: DateTime<Utc>,
}

impl RememberMeToken {
    /// Value for the remember-me cookie
    pub fn cookie_value(&self) -> String {
        encode_remember_me(&self.series, &self.token_value)
    }
}

impl From<PersistentLogin> for RememberMeToken {
    fn from(row: PersistentLogin) -> Self {
        Self {
            series: row.series,
            token_value: row.token_value,
            username: row.username,
            last_used: row.last_used,
        }
    }
}

/// Outcome of a successful validation
#[derive(Debug, Clone)]
pub struct RememberMeLogin {
    pub principal: Principal,
    /// The rotated token the client must store next
    pub token: RememberMeToken,
}

/// Short, loggable prefix of a series
fn series_hint(series: &str) -> &str {
    series.get(..6).unwrap_or(series)
}

/// Issues, validates, rotates and revokes remember-me tokens
#[derive(Clone)]
pub struct PersistentTokenStore {
    repo: Arc<dyn TokenRepository>,
    users: Arc<dyn CredentialLookup>,
    max_age: chrono::Duration,
    series_bytes: usize,
    token_bytes: usize,
    timeout: Duration,
}

impl PersistentTokenStore {
    pub fn new(
        repo: Arc<dyn TokenRepository>,
        users: Arc<dyn CredentialLookup>,
        settings: &RememberMeSettings,
    ) -> Self {
        Self {
            repo,
            users,
            max_age: settings.token_validity(),
            series_bytes: settings.series_bytes,
            token_bytes: settings.token_bytes,
            timeout: settings.store_timeout(),
        }
    }

    /// Maximum token age, measured from last use
    pub fn max_age(&self) -> chrono::Duration {
        self.max_age
    }

    /// Run a repository call under the store timeout
    async fn guarded<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.timeout, fut).await?
    }

    /// Create and persist a new series for `username`
    pub async fn issue(&self, username: &str) -> Result<RememberMeToken, AppError> {
        let row = PersistentLogin {
            series: random_token(self.series_bytes),
            token_value: random_token(self.token_bytes),
            username: username.to_string(),
            last_used: Utc::now(),
        };
        self.guarded(self.repo.create_new_token(row.clone())).await?;

        counter!(REMEMBER_ME_ISSUED).increment(1);
        tracing::debug!(username, series = series_hint(&row.series), "issued remember-me token");
        Ok(row.into())
    }

    /// Check a presented pair and rotate it on success
    pub async fn validate(
        &self,
        series: &str,
        token_value: &str,
    ) -> Result<RememberMeLogin, AppError> {
        let new_value = random_token(self.token_bytes);
        let outcome = self
            .guarded(self.repo.rotate_token(
                series,
                token_value,
                &new_value,
                Utc::now(),
                self.max_age,
            ))
            .await?;

        let row = match outcome {
            RotateOutcome::Rotated(row) => row,
            RotateOutcome::NotFound => return Err(self.reject(series, TokenRejection::UnknownSeries)),
            RotateOutcome::Mismatch(row) => {
                tracing::warn!(
                    username = %row.username,
                    series = series_hint(series),
                    "remember-me token mismatch, possible cookie theft; series revoked"
                );
                return Err(self.reject(series, TokenRejection::Mismatch));
            },
            RotateOutcome::Expired(_) => return Err(self.reject(series, TokenRejection::Expired)),
        };

        let principal = match self.users.lookup(&row.username).await? {
            Some(principal) => principal,
            None => {
                self.guarded(self.repo.remove_series(series)).await?;
                return Err(self.reject(series, TokenRejection::UnknownUser));
            },
        };

        counter!(REMEMBER_ME_ROTATED).increment(1);
        tracing::debug!(
            username = %row.username,
            series = series_hint(series),
            "remember-me token rotated"
        );
        Ok(RememberMeLogin {
            principal,
            token: row.into(),
        })
    }

    /// Decode a cookie value and validate it
    pub async fn validate_cookie(&self, cookie_value: &str) -> Result<RememberMeLogin, AppError> {
        let (series, token_value) = match decode_remember_me(cookie_value) {
            Ok(pair) => pair,
            Err(err) => {
                counter!(REMEMBER_ME_REJECTED).increment(1);
                return Err(err);
            },
        };
        self.validate(&series, &token_value).await
    }

    fn reject(&self, series: &str, reason: TokenRejection) -> AppError {
        counter!(REMEMBER_ME_REJECTED).increment(1);
        tracing::debug!(series = series_hint(series), %reason, "remember-me token rejected");
        AppError::TokenRejected(reason)
    }

    /// Delete one series (logout)
    pub async fn revoke(&self, series: &str) -> Result<bool, AppError> {
        self.guarded(self.repo.remove_series(series)).await
    }

    /// Delete every series of a user ("log out everywhere", password change)
    pub async fn revoke_all(&self, username: &str) -> Result<usize, AppError> {
        let removed = self.guarded(self.repo.remove_user_tokens(username)).await?;
        tracing::info!(username, removed, "revoked all remember-me tokens");
        Ok(removed)
    }

    /// Delete every row past its validity
    pub async fn sweep_expired(&self) -> Result<usize, AppError> {
        let cutoff = Utc::now() - self.max_age;
        let removed = self.guarded(self.repo.remove_expired(cutoff)).await?;
        if removed > 0 {
            counter!(REMEMBER_ME_SWEPT).increment(removed as u64);
            tracing::info!(removed, "swept expired remember-me tokens");
        }
        Ok(removed)
    }

    /// Run `sweep_expired` every `interval` until the task is aborted
    pub fn spawn_expiry_sweep(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep_expired().await {
                    tracing::warn!(error = %err, "remember-me expiry sweep failed");
                }
            }
        })
    }
}
