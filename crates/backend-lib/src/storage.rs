// ============================
// formguard-backend-lib/src/storage.rs
// ============================
//! Durable remember-me token storage with in-memory and flat-file implementations.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use formguard_common::PersistentLogin;
use tokio::{fs as tokio_fs, sync::Mutex};

use crate::error::AppError;

/// File holding every persisted login under the data directory
pub const TOKEN_FILE: &str = "persistent_logins.json";

/// Result of an atomic compare-and-rotate on one series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateOutcome {
    /// Value matched and the row now carries the new value
    Rotated(PersistentLogin),
    /// No row for the series
    NotFound,
    /// Value differed; the row has been deleted
    Mismatch(PersistentLogin),
    /// Row was past its validity; the row has been deleted
    Expired(PersistentLogin),
}

/// Trait for remember-me token backends, keyed by series
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a freshly issued row
    async fn create_new_token(&self, token: PersistentLogin) -> Result<(), AppError>;

    /// Fetch the row for a series
    async fn get_token_for_series(&self, series: &str)
        -> Result<Option<PersistentLogin>, AppError>;

    /// Compare `presented` with the stored value and rotate to `new_value`
    /// in one step. Mismatched and expired rows are deleted in the same step.
    async fn rotate_token(
        &self,
        series: &str,
        presented: &str,
        new_value: &str,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Result<RotateOutcome, AppError>;

    /// Delete one series; returns whether it existed
    async fn remove_series(&self, series: &str) -> Result<bool, AppError>;

    /// Delete every series owned by a user
    async fn remove_user_tokens(&self, username: &str) -> Result<usize, AppError>;

    /// Delete rows last used before `cutoff`
    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError>;
}

/// Compare without short-circuiting on the first differing byte
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Apply compare-and-rotate to a row the caller holds exclusively.
/// Returns the outcome and whether the row must be deleted.
fn rotate_row(
    row: &mut PersistentLogin,
    presented: &str,
    new_value: &str,
    now: DateTime<Utc>,
    max_age: chrono::Duration,
) -> (RotateOutcome, bool) {
    if !constant_time_eq(row.token_value.as_bytes(), presented.as_bytes()) {
        return (RotateOutcome::Mismatch(row.clone()), true);
    }
    if row.is_expired(now, max_age) {
        return (RotateOutcome::Expired(row.clone()), true);
    }
    row.token_value = new_value.to_string();
    row.last_used = now;
    (RotateOutcome::Rotated(row.clone()), false)
}

/// In-memory implementation; lost on restart
#[derive(Clone, Default)]
pub struct InMemoryTokenRepository {
    rows: Arc<DashMap<String, PersistentLogin>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn create_new_token(&self, token: PersistentLogin) -> Result<(), AppError> {
        match self.rows.entry(token.series.clone()) {
            Entry::Occupied(_) => Err(AppError::Internal("duplicate remember-me series".into())),
            Entry::Vacant(slot) => {
                slot.insert(token);
                Ok(())
            },
        }
    }

    async fn get_token_for_series(
        &self,
        series: &str,
    ) -> Result<Option<PersistentLogin>, AppError> {
        Ok(self.rows.get(series).map(|row| row.value().clone()))
    }

    async fn rotate_token(
        &self,
        series: &str,
        presented: &str,
        new_value: &str,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Result<RotateOutcome, AppError> {
        // The entry guard holds the shard lock for the whole check-and-rotate
        match self.rows.entry(series.to_string()) {
            Entry::Vacant(_) => Ok(RotateOutcome::NotFound),
            Entry::Occupied(mut slot) => {
                let (outcome, delete) =
                    rotate_row(slot.get_mut(), presented, new_value, now, max_age);
                if delete {
                    slot.remove();
                }
                Ok(outcome)
            },
        }
    }

    async fn remove_series(&self, series: &str) -> Result<bool, AppError> {
        Ok(self.rows.remove(series).is_some())
    }

    async fn remove_user_tokens(&self, username: &str) -> Result<usize, AppError> {
        let before = self.rows.len();
        self.rows.retain(|_, row| row.username != username);
        Ok(before.saturating_sub(self.rows.len()))
    }

    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.rows.len();
        self.rows.retain(|_, row| row.last_used >= cutoff);
        Ok(before.saturating_sub(self.rows.len()))
    }
}

/// Flat-file implementation: one JSON document rewritten on every change
#[derive(Clone)]
pub struct FlatFileTokenRepository {
    path: PathBuf,
    rows: Arc<Mutex<HashMap<String, PersistentLogin>>>,
    writes: Arc<AtomicU64>,
}

impl FlatFileTokenRepository {
    /// Open (or create) the token file under `root`
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, AppError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root).await.map_err(store_io)?;
        let path = root.join(TOKEN_FILE);
        remove_stale_temp_files(&root).await?;

        let rows = if tokio_fs::try_exists(&path).await.map_err(store_io)? {
            let content = tokio_fs::read_to_string(&path).await.map_err(store_io)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                let list: Vec<PersistentLogin> = serde_json::from_str(&content)?;
                list.into_iter().map(|row| (row.series.clone(), row)).collect()
            }
        } else {
            HashMap::new()
        };

        tracing::debug!(path = %path.display(), rows = rows.len(), "opened token file");

        Ok(Self {
            path,
            rows: Arc::new(Mutex::new(rows)),
            writes: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `next` to the token file and install it as the live table.
    ///
    /// The temp-file write is the only await. The rename and the swap run
    /// without yielding, so a call dropped by a timeout leaves both the file
    /// and `rows` at their previous state.
    async fn commit(
        &self,
        rows: &mut HashMap<String, PersistentLogin>,
        next: HashMap<String, PersistentLogin>,
    ) -> Result<(), AppError> {
        let mut list: Vec<&PersistentLogin> = next.values().collect();
        list.sort_by(|a, b| a.series.cmp(&b.series));
        let json = serde_json::to_string_pretty(&list)?;

        // A cancelled write may still be running in the blocking pool
        let n = self.writes.fetch_add(1, Ordering::Relaxed);
        let tmp = self.path.with_extension(format!("json.{n}.tmp"));
        tokio_fs::write(&tmp, json).await.map_err(store_io)?;
        if let Err(err) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(store_io(err));
        }

        *rows = next;
        Ok(())
    }
}

/// Remove temp files left behind by interrupted writes
async fn remove_stale_temp_files(root: &Path) -> Result<(), AppError> {
    let mut entries = tokio_fs::read_dir(root).await.map_err(store_io)?;
    while let Some(entry) = entries.next_entry().await.map_err(store_io)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(TOKEN_FILE) && name.ends_with(".tmp") {
            tokio_fs::remove_file(entry.path()).await.map_err(store_io)?;
        }
    }
    Ok(())
}

fn store_io(err: std::io::Error) -> AppError {
    AppError::StoreUnavailable(err.to_string())
}

#[async_trait]
impl TokenRepository for FlatFileTokenRepository {
    async fn create_new_token(&self, token: PersistentLogin) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&token.series) {
            return Err(AppError::Internal("duplicate remember-me series".into()));
        }
        let mut next = rows.clone();
        next.insert(token.series.clone(), token);
        self.commit(&mut rows, next).await
    }

    async fn get_token_for_series(
        &self,
        series: &str,
    ) -> Result<Option<PersistentLogin>, AppError> {
        Ok(self.rows.lock().await.get(series).cloned())
    }

    async fn rotate_token(
        &self,
        series: &str,
        presented: &str,
        new_value: &str,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Result<RotateOutcome, AppError> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.get(series) else {
            return Ok(RotateOutcome::NotFound);
        };

        let mut updated = row.clone();
        let (outcome, delete) = rotate_row(&mut updated, presented, new_value, now, max_age);
        let mut next = rows.clone();
        if delete {
            next.remove(series);
        } else {
            next.insert(series.to_string(), updated);
        }

        self.commit(&mut rows, next).await?;
        Ok(outcome)
    }

    async fn remove_series(&self, series: &str) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().await;
        if !rows.contains_key(series) {
            return Ok(false);
        }
        let mut next = rows.clone();
        next.remove(series);
        self.commit(&mut rows, next).await?;
        Ok(true)
    }

    async fn remove_user_tokens(&self, username: &str) -> Result<usize, AppError> {
        let mut rows = self.rows.lock().await;
        let mut next = rows.clone();
        next.retain(|_, row| row.username != username);
        let removed = rows.len() - next.len();
        if removed > 0 {
            self.commit(&mut rows, next).await?;
        }
        Ok(removed)
    }

    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut rows = self.rows.lock().await;
        let mut next = rows.clone();
        next.retain(|_, row| row.last_used >= cutoff);
        let removed = rows.len() - next.len();
        if removed > 0 {
            self.commit(&mut rows, next).await?;
        }
        Ok(removed)
    }
}
