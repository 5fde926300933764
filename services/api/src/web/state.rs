//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the in-memory job table.

use crate::config::Config;
use crate::web::auth::SESSION_DAYS;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;
use web_summarizer_core::{
    AccountStore, CreditLedger, LoginGuard, RenderService, SessionRegistry, SummaryOutcome,
    SummaryPipeline, SummaryService,
};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub db: Arc<dyn AccountStore>,
    pub ledger: Arc<dyn CreditLedger>,
    pub config: Arc<Config>,
    pub pipeline: SummaryPipeline,
    /// Per-sign-in rate limit and history, keyed by auth session id.
    pub sessions: SessionRegistry,
    pub jobs: DashMap<Uuid, JobEntry>,
    pub login_guard: Mutex<LoginGuard>,
}

impl AppState {
    pub fn new<S>(
        store: Arc<S>,
        renderer: Arc<dyn RenderService>,
        summarizer: Arc<dyn SummaryService>,
        config: Arc<Config>,
    ) -> Self
    where
        S: AccountStore + 'static,
    {
        let ledger: Arc<dyn CreditLedger> = store.clone();
        let pipeline = SummaryPipeline::new(
            renderer,
            summarizer,
            ledger.clone(),
            config.pipeline_settings(),
        );
        Self {
            db: store,
            ledger,
            sessions: SessionRegistry::new(config.min_request_interval()),
            pipeline,
            config,
            jobs: DashMap::new(),
            login_guard: Mutex::new(LoginGuard::default()),
        }
    }

    /// Cancels and forgets every job started from `session_id`.
    pub fn drop_session_jobs(&self, session_id: &str) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            if job.session_id == session_id {
                job.cancel.cancel();
                false
            } else {
                true
            }
        });
        before - self.jobs.len()
    }

    /// Forgets jobs that finished more than `job_retention` before `now`.
    /// Pending jobs are never touched.
    pub fn purge_finished_jobs(&self, now: Instant) -> usize {
        let retention = self.config.job_retention;
        let before = self.jobs.len();
        self.jobs.retain(|_, job| match job.finished_at {
            Some(finished) => now.saturating_duration_since(finished) < retention,
            None => true,
        });
        before - self.jobs.len()
    }

    /// One sweep over every in-memory table: finished jobs, sign-in failure
    /// records and session contexts idle longer than an auth session can live.
    pub async fn purge_stale(&self, now: Instant) {
        let jobs = self.purge_finished_jobs(now);
        let failures = self.login_guard.lock().await.purge_stale(now);

        let max_idle = Duration::from_secs(SESSION_DAYS as u64 * 24 * 60 * 60);
        let idle = self.sessions.purge_idle(now, max_idle).await;
        let orphaned: usize = idle.iter().map(|id| self.drop_session_jobs(id)).sum();

        if jobs + failures + idle.len() > 0 {
            info!(jobs, failures, sessions = idle.len(), orphaned, "Swept stale in-memory state");
        }
    }
}

/// Runs `purge_stale` every `config.sweep_interval` until the task is aborted.
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let every = state.config.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.purge_stale(Instant::now()).await;
        }
    })
}

//=========================================================================================
// Summary Jobs
//=========================================================================================

#[derive(Debug, Clone)]
pub enum JobStatus {
    Pending,
    Done(SummaryOutcome),
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done(_) => "done",
            JobStatus::Failed(_) => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// A summarization running (or finished) in the background.
pub struct JobEntry {
    pub account_id: Uuid,
    pub session_id: String,
    pub url: String,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    /// Set when the job leaves `Pending`; starts the retention clock.
    pub finished_at: Option<Instant>,
    pub cancel: CancellationToken,
}
