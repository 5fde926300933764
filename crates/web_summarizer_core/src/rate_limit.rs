//! crates/web_summarizer_core/src/rate_limit.rs
//!
//! Minimum-spacing rate limiter. One instance lives inside each session context,
//! so sessions never share state.

use std::time::{Duration, Instant};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// The caller must wait this many whole seconds (rounded up) before retrying.
    Rejected { wait_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Enforces `min_interval` between accepted requests.
///
/// The window is measured from the last *accepted* request; rejected attempts
/// never move it.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// A limiter allowing `requests_per_minute` evenly spaced requests.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(Duration::from_secs_f64(60.0 / f64::from(requests_per_minute.max(1))))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Checks whether a request at `now` would be accepted, without recording it.
    pub fn check(&self, now: Instant) -> RateDecision {
        let Some(last) = self.last_accepted else {
            return RateDecision::Allowed;
        };
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.min_interval {
            RateDecision::Allowed
        } else {
            let remaining = self.min_interval - elapsed;
            RateDecision::Rejected {
                wait_secs: remaining.as_secs_f64().ceil() as u64,
            }
        }
    }

    /// Marks a request at `now` as accepted.
    pub fn record(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }

    /// Checks and, on acceptance, records in one step.
    pub fn allow(&mut self, now: Instant) -> RateDecision {
        let decision = self.check(now);
        if decision.is_allowed() {
            self.record(now);
        }
        decision
    }
}
