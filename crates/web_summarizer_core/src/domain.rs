//! crates/web_summarizer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents a user account - used throughout app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account_id: Uuid,
    pub username: String,
    pub password_hash: String,
}

/// A single credit held against an account while a summarization runs.
///
/// Not `Clone`: a reservation is consumed exactly once, either by
/// `CreditLedger::commit` or by `CreditLedger::release`.
#[derive(Debug, PartialEq, Eq)]
pub struct Reservation {
    pub account_id: Uuid,
}

/// Non-fatal notices produced while extracting page text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionWarning {
    #[error("Content length {original_chars} exceeds maximum limit of {max_chars} characters. Text was truncated.")]
    Truncated {
        original_chars: usize,
        max_chars: usize,
    },
}

/// One past summarization, kept for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub summary: String,
}

/// Everything a successful pipeline run hands back to the caller.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub url: String,
    pub summary: String,
    pub notices: Vec<ExtractionWarning>,
    pub created_at: DateTime<Utc>,
    pub remaining_credits: i64,
    pub download_name: String,
}

/// Name of the plain-text download for a summary created at `at`,
/// e.g. `summary_20250101_093000.txt`.
pub fn download_file_name(at: DateTime<Utc>) -> String {
    format!("summary_{}.txt", at.format("%Y%m%d_%H%M%S"))
}
