//! crates/web_summarizer_core/src/session.rs
//!
//! Per-session state. A `SessionContext` is opened when a user signs in and
//! closed when they sign out; nothing here outlives the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::history::HistoryLog;
use crate::rate_limit::RateLimiter;

/// The state for a single signed-in session.
#[derive(Debug)]
pub struct SessionContext {
    pub account_id: Uuid,
    pub rate_limiter: RateLimiter,
    pub history: HistoryLog,
}

impl SessionContext {
    pub fn new(account_id: Uuid, min_interval: Duration) -> Self {
        Self {
            account_id,
            rate_limiter: RateLimiter::new(min_interval),
            history: HistoryLog::new(),
        }
    }
}

#[derive(Debug)]
struct OpenSession {
    context: Arc<Mutex<SessionContext>>,
    last_seen: Instant,
}

/// All open sessions, keyed by auth session id.
#[derive(Debug)]
pub struct SessionRegistry {
    min_interval: Duration,
    sessions: RwLock<HashMap<String, OpenSession>>,
}

impl SessionRegistry {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn fresh(&self, account_id: Uuid) -> OpenSession {
        OpenSession {
            context: Arc::new(Mutex::new(SessionContext::new(account_id, self.min_interval))),
            last_seen: Instant::now(),
        }
    }

    /// Opens a fresh context for `session_id`, replacing any previous one.
    pub async fn open(&self, session_id: &str, account_id: Uuid) -> Arc<Mutex<SessionContext>> {
        let session = self.fresh(account_id);
        let context = session.context.clone();
        self.sessions.write().await.insert(session_id.to_string(), session);
        context
    }

    /// Returns the context for `session_id`, opening one if the session is valid
    /// but its context was lost (e.g. after a restart).
    pub async fn get_or_open(&self, session_id: &str, account_id: Uuid) -> Arc<Mutex<SessionContext>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| self.fresh(account_id));
        session.last_seen = Instant::now();
        session.context.clone()
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionContext>>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        session.last_seen = Instant::now();
        Some(session.context.clone())
    }

    /// Tears the session down, dropping its history and rate-limit state.
    pub async fn close(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Closes every session not used for `max_idle`, returning their ids.
    pub async fn purge_idle(&self, now: Instant, max_idle: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| now.saturating_duration_since(session.last_seen) >= max_idle)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &idle {
            sessions.remove(id);
        }
        idle
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_do_not_share_rate_limit_state() {
        let registry = SessionRegistry::new(Duration::from_secs(6));
        let account = Uuid::new_v4();
        let first = registry.open("a", account).await;
        let second = registry.open("b", account).await;

        let now = Instant::now();
        assert!(first.lock().await.rate_limiter.allow(now).is_allowed());
        assert!(second.lock().await.rate_limiter.allow(now).is_allowed());
        assert!(!first.lock().await.rate_limiter.allow(now).is_allowed());
    }

    #[tokio::test]
    async fn get_or_open_reuses_existing_context() {
        let registry = SessionRegistry::new(Duration::from_secs(6));
        let account = Uuid::new_v4();
        let opened = registry.get_or_open("a", account).await;
        let again = registry.get_or_open("a", account).await;
        assert!(Arc::ptr_eq(&opened, &again));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn close_tears_the_context_down() {
        let registry = SessionRegistry::new(Duration::from_secs(6));
        registry.open("a", Uuid::new_v4()).await;
        assert!(registry.close("a").await);
        assert!(registry.get("a").await.is_none());
        assert!(!registry.close("a").await);
    }

    #[tokio::test]
    async fn idle_sessions_are_purged() {
        let registry = SessionRegistry::new(Duration::from_secs(6));
        let max_idle = Duration::from_secs(60);
        registry.open("a", Uuid::new_v4()).await;
        registry.open("b", Uuid::new_v4()).await;

        assert!(registry.purge_idle(Instant::now(), max_idle).await.is_empty());
        assert_eq!(registry.len().await, 2);

        let mut purged = registry.purge_idle(Instant::now() + Duration::from_secs(61), max_idle).await;
        purged.sort();
        assert_eq!(purged, ["a", "b"]);
        assert_eq!(registry.len().await, 0);
    }
}
