// ============================
// formguard-backend-lib/src/auth/session.rs
// ============================
//! Session handling and management.
use metrics::{counter, gauge};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle, time::Instant};

use super::token_generator::{csrf_token, session_id};
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Session information
#[derive(Clone, Debug)]
pub struct Session {
    /// Opaque id carried in the session cookie
    pub id: String,
    pub username: String,
    /// Remember-me series issued for (or used by) this login, if any
    pub remember_me_series: Option<String>,
    /// Per-session CSRF token
    pub csrf_token: String,
    pub created_at: Instant,
    pub last_active: Instant,
}

/// Session manager keyed by session id
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_ttl: Duration,
    absolute_ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(idle_ttl: Duration, absolute_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
            absolute_ttl,
        }
    }

    fn is_live(&self, session: &Session, now: Instant) -> bool {
        now.duration_since(session.last_active) < self.idle_ttl
            && now.duration_since(session.created_at) < self.absolute_ttl
    }

    /// Create a new session
    pub async fn create_session(
        &self,
        username: &str,
        remember_me_series: Option<String>,
    ) -> Session {
        let now = Instant::now();
        let session = Session {
            id: session_id(),
            username: username.to_string(),
            remember_me_series,
            csrf_token: csrf_token(),
            created_at: now,
            last_active: now,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        session
    }

    /// Get a live session by id and mark it active. Expired sessions are dropped.
    pub async fn touch(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let live = sessions.get(id).map(|session| self.is_live(session, now))?;
        if !live {
            sessions.remove(id);
            counter!(SESSION_EXPIRED).increment(1);
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
            return None;
        }

        let session = sessions.get_mut(id)?;
        session.last_active = now;
        Some(session.clone())
    }

    /// Get a live session without refreshing its idle timer
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|session| self.is_live(session, now))
            .cloned()
    }

    /// Remove a session, returning it if it existed (live or not)
    pub async fn invalidate(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Number of stored sessions, including ones not yet swept
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every expired session
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before_count = sessions.len();

        sessions.retain(|_, session| self.is_live(session, now));

        let after_count = sessions.len();
        let removed = before_count - after_count;

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(after_count as f64);
        }
        removed
    }

    /// Cleanup task that runs periodically to remove expired sessions
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = manager.cleanup_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "expired sessions removed");
                }
            }
        })
    }
}
