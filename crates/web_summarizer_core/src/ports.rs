//! crates/web_summarizer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, browsers
//! or model endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::domain::{Account, AccountCredentials, Reservation};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for storage port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Insufficient credits")]
    InsufficientCredits,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures while driving the headless browser.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Failed to capture page content: {0}")]
    Capture(String),
    #[error("Rendering timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures while asking the model endpoint for a summary.
#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("Model endpoint unreachable: {0}")]
    Transport(String),
    #[error("Model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Model endpoint timed out after {0:?}")]
    Timeout(Duration),
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
    #[error("Model returned an empty summary")]
    Empty,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RenderService: Send + Sync {
    /// Loads `url` in a JavaScript-enabled browser and returns the final DOM as HTML.
    async fn render(&self, url: &Url) -> Result<String, RenderError>;
}

#[async_trait]
pub trait SummaryService: Send + Sync {
    /// Produces a summary of already-extracted page text.
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError>;
}

/// Per-account credit balance.
///
/// `reserve` is the only gate: it atomically holds one credit if the available
/// balance (credits minus held reservations) is positive, and fails with
/// `PortError::InsufficientCredits` otherwise.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn get_balance(&self, account_id: Uuid) -> PortResult<i64>;

    /// Balance minus credits currently held by in-flight runs.
    async fn get_available(&self, account_id: Uuid) -> PortResult<i64>;

    /// Subtracts `amount` with no floor.
    async fn deduct(&self, account_id: Uuid, amount: i64) -> PortResult<()>;

    async fn reserve(&self, account_id: Uuid) -> PortResult<Reservation>;

    /// Turns a held reservation into a one-credit deduction and returns the
    /// balance left afterwards.
    async fn commit(&self, reservation: Reservation) -> PortResult<i64>;

    /// Drops a held reservation without charging.
    async fn release(&self, reservation: Reservation) -> PortResult<()>;
}

#[async_trait]
pub trait AccountStore: CreditLedger {
    // --- Account Management ---
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<Account>;

    async fn get_account(&self, account_id: Uuid) -> PortResult<Account>;

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<AccountCredentials>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
