//! crates/web_summarizer_core/src/pipeline.rs
//!
//! The extraction-and-summarization pipeline with credit metering.
//!
//! A run is split in two phases so a web front end can answer quickly:
//! `admit` performs the cheap gates (URL, rate limit, credit reservation) and
//! `execute` does the expensive work (render, extract, summarize) before
//! committing the credit and appending to the session history.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use crate::domain::{download_file_name, ExtractionWarning, HistoryEntry, Reservation, SummaryOutcome};
use crate::extractor::extract_text;
use crate::ports::{CreditLedger, PortError, RenderError, RenderService, SummarizationError, SummaryService};
use crate::rate_limit::RateDecision;
use crate::session::SessionContext;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 100_000;

/// Pipeline tuning. Rate-limit spacing is not here: it belongs to each
/// session's `RateLimiter`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum number of characters sent to the model.
    pub max_content_length: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Please wait {wait_secs} seconds before making another request.")]
    RateLimited { wait_secs: u64 },

    #[error("You have no credits remaining!")]
    InsufficientCredits,

    #[error("Error extracting text from URL: {0}")]
    Render(#[from] RenderError),

    #[error("No readable text found at {0}")]
    NoContent(String),

    #[error("Error generating summary: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("Summarization was cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(PortError),
}

impl From<PortError> for PipelineError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::InsufficientCredits => PipelineError::InsufficientCredits,
            other => PipelineError::Storage(other),
        }
    }
}

/// A run that passed every gate and holds one reserved credit.
///
/// Must be handed to `SummaryPipeline::execute`, which either commits or
/// releases the reservation.
#[derive(Debug)]
pub struct Admission {
    pub url: Url,
    reservation: Reservation,
}

pub struct SummaryPipeline {
    renderer: Arc<dyn RenderService>,
    summarizer: Arc<dyn SummaryService>,
    ledger: Arc<dyn CreditLedger>,
    settings: PipelineSettings,
}

impl SummaryPipeline {
    pub fn new(
        renderer: Arc<dyn RenderService>,
        summarizer: Arc<dyn SummaryService>,
        ledger: Arc<dyn CreditLedger>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            renderer,
            summarizer,
            ledger,
            settings,
        }
    }

    /// Accepts absolute `http`/`https` URLs only.
    pub fn parse_url(raw: &str) -> Result<Url, PipelineError> {
        let trimmed = raw.trim();
        let invalid = |reason: String| PipelineError::InvalidUrl {
            url: trimmed.to_string(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(invalid("Please enter a URL".to_string()));
        }
        let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme '{other}'"))),
        }
    }

    /// Runs the cheap gates for a request made in `session`.
    ///
    /// The rate-limit window only advances once the credit reservation succeeded,
    /// so a request refused for lack of credits is not counted.
    pub async fn admit(&self, session: &mut SessionContext, raw_url: &str) -> Result<Admission, PipelineError> {
        let url = Self::parse_url(raw_url)?;
        let now = Instant::now();

        if let RateDecision::Rejected { wait_secs } = session.rate_limiter.check(now) {
            warn!(account_id = %session.account_id, wait_secs, "Rate limit rejected request");
            return Err(PipelineError::RateLimited { wait_secs });
        }

        let reservation = self.ledger.reserve(session.account_id).await.map_err(|e| {
            if matches!(e, PortError::InsufficientCredits) {
                warn!(account_id = %session.account_id, "Request refused: no credits available");
            }
            PipelineError::from(e)
        })?;
        session.rate_limiter.record(now);

        info!(account_id = %session.account_id, url = %url, "Request admitted");
        Ok(Admission { url, reservation })
    }

    /// Renders, extracts and summarizes, then commits the credit and records
    /// the result in the session history. On any failure the reservation is
    /// released and neither the balance nor the history changes.
    pub async fn execute(
        &self,
        session: &Mutex<SessionContext>,
        admission: Admission,
        cancel: &CancellationToken,
    ) -> Result<SummaryOutcome, PipelineError> {
        let Admission { url, reservation } = admission;
        let account_id = reservation.account_id;

        let (summary, notices) = match self.produce(&url, cancel).await {
            Ok(produced) => produced,
            Err(err) => {
                error!(account_id = %account_id, url = %url, "Pipeline failed: {}", err);
                if let Err(release_err) = self.ledger.release(reservation).await {
                    error!(account_id = %account_id, "Failed to release credit reservation: {:?}", release_err);
                }
                return Err(err);
            }
        };

        // A failed commit consumes the reservation but leaves its credit held
        // until `clear_stale_reservations` runs at the next startup. Nothing is
        // charged and the history is untouched.
        let remaining_credits = self.ledger.commit(reservation).await.map_err(|e| {
            error!(account_id = %account_id, url = %url, "Failed to commit credit, summary discarded: {:?}", e);
            PipelineError::from(e)
        })?;
        let created_at = Utc::now();
        session.lock().await.history.append(HistoryEntry {
            created_at,
            url: url.to_string(),
            summary: summary.clone(),
        });
        info!(account_id = %account_id, url = %url, remaining_credits, "Summary committed");

        Ok(SummaryOutcome {
            url: url.to_string(),
            summary,
            notices,
            created_at,
            remaining_credits,
            download_name: download_file_name(created_at),
        })
    }

    /// `admit` followed by `execute`, for callers that can wait.
    pub async fn run(
        &self,
        session: &Mutex<SessionContext>,
        raw_url: &str,
        cancel: &CancellationToken,
    ) -> Result<SummaryOutcome, PipelineError> {
        let admission = {
            let mut context = session.lock().await;
            self.admit(&mut context, raw_url).await?
        };
        self.execute(session, admission, cancel).await
    }

    async fn produce(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<(String, Vec<ExtractionWarning>), PipelineError> {
        let render_start = Instant::now();
        info!(url = %url, "Rendering page");
        let html = until_cancelled(cancel, self.renderer.render(url)).await??;
        info!(url = %url, bytes = html.len(), elapsed = ?render_start.elapsed(), "Page rendered");

        let extraction = extract_text(&html, self.settings.max_content_length);
        let mut notices = Vec::new();
        if let Some(warning) = extraction.warning {
            warn!(url = %url, "{}", warning);
            notices.push(warning);
        }
        if extraction.text.is_empty() {
            return Err(PipelineError::NoContent(url.to_string()));
        }
        info!(url = %url, chars = extraction.text.chars().count(), "Text extracted");

        let summarize_start = Instant::now();
        let summary = until_cancelled(cancel, self.summarizer.summarize(&extraction.text)).await??;
        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(SummarizationError::Empty.into());
        }
        info!(url = %url, elapsed = ?summarize_start.elapsed(), "Summary generated");

        Ok((summary, notices))
    }
}

async fn until_cancelled<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        out = fut => Ok(out),
    }
}
