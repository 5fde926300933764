//! crates/web_summarizer_core/src/login_guard.rs
//!
//! Locks a username out after repeated failed sign-ins.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_FAILURES: u32 = 5;
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Too many failed sign-in attempts. Try again in {retry_after_secs} seconds.")]
pub struct LockedOut {
    pub retry_after_secs: u64,
}

#[derive(Debug)]
struct FailureRecord {
    consecutive: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

#[derive(Debug)]
pub struct LoginGuard {
    max_failures: u32,
    lockout: Duration,
    records: HashMap<String, FailureRecord>,
}

impl Default for LoginGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES, DEFAULT_LOCKOUT)
    }
}

impl LoginGuard {
    pub fn new(max_failures: u32, lockout: Duration) -> Self {
        Self {
            max_failures: max_failures.max(1),
            lockout,
            records: HashMap::new(),
        }
    }

    /// Fails while `username` is locked. An expired lock is cleared.
    pub fn check(&mut self, username: &str, now: Instant) -> Result<(), LockedOut> {
        let Some(record) = self.records.get_mut(username) else {
            return Ok(());
        };
        match record.locked_until {
            Some(until) if until > now => Err(LockedOut {
                retry_after_secs: (until - now).as_secs_f64().ceil() as u64,
            }),
            Some(_) => {
                self.records.remove(username);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn record_failure(&mut self, username: &str, now: Instant) {
        let record = self.records.entry(username.to_string()).or_insert(FailureRecord {
            consecutive: 0,
            last_failure: now,
            locked_until: None,
        });
        record.consecutive += 1;
        record.last_failure = now;
        if record.consecutive >= self.max_failures {
            record.locked_until = Some(now + self.lockout);
        }
    }

    pub fn record_success(&mut self, username: &str) {
        self.records.remove(username);
    }

    /// Drops records that are neither locked nor failed within the lockout
    /// window. Returns how many were removed.
    pub fn purge_stale(&mut self, now: Instant) -> usize {
        let before = self.records.len();
        let lockout = self.lockout;
        self.records.retain(|_, record| match record.locked_until {
            Some(until) => until > now,
            None => now.saturating_duration_since(record.last_failure) < lockout,
        });
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
