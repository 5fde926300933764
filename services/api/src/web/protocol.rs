//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged by the summary, history and account
//! endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use web_summarizer_core::HistoryEntry;

use crate::web::state::{JobEntry, JobStatus};

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct SummarizeRequest {
    /// Absolute `http` or `https` URL of the page to summarize.
    pub url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// How many entries to return, newest first. Defaults to 5.
    pub limit: Option<usize>,
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub job_id: Uuid,
    /// One of `pending`, `done`, `failed` or `cancelled`.
    pub status: String,
    pub url: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_credits: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResponse {
    pub fn from_entry(job_id: Uuid, job: &JobEntry) -> Self {
        let mut response = Self {
            job_id,
            status: job.status.label().to_string(),
            url: job.url.clone(),
            submitted_at: job.submitted_at,
            summary: None,
            notices: Vec::new(),
            remaining_credits: None,
            download_name: None,
            error: None,
        };
        match &job.status {
            JobStatus::Done(outcome) => {
                response.summary = Some(outcome.summary.clone());
                response.notices = outcome.notices.iter().map(|n| n.to_string()).collect();
                response.remaining_credits = Some(outcome.remaining_credits);
                response.download_name = Some(outcome.download_name.clone());
            }
            JobStatus::Failed(message) => response.error = Some(message.clone()),
            JobStatus::Pending | JobStatus::Cancelled => {}
        }
        response
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryItem {
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub summary: String,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            created_at: entry.created_at,
            url: entry.url,
            summary: entry.summary,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub account_id: Uuid,
    pub username: String,
    pub email: String,
    pub credits: i64,
    /// Credits minus those held by summaries still running.
    pub available_credits: i64,
}
