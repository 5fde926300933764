//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how each
//! variant is presented to HTTP clients.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;
use web_summarizer_core::{LockedOut, PipelineError, PortError};

use crate::config::ConfigError;
use crate::credentials::CredentialError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A failed or refused summarization run.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migrations could not be applied at startup.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Signup form failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("Username or email already exists!")]
    DuplicateAccount,

    #[error("Invalid username or password!")]
    InvalidCredentials,

    #[error("Please sign in first")]
    NotSignedIn,

    #[error(transparent)]
    LockedOut(#[from] LockedOut),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(err) => match err {
                PipelineError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
                PipelineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                PipelineError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
                PipelineError::Render(_)
                | PipelineError::NoContent(_)
                | PipelineError::Summarization(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Cancelled => StatusCode::CONFLICT,
                PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Port(PortError::NotFound(_)) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Unauthorized)
            | ApiError::InvalidCredentials
            | ApiError::NotSignedIn => StatusCode::UNAUTHORIZED,
            ApiError::Port(PortError::InsufficientCredits) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Port(PortError::Duplicate(_)) | ApiError::DuplicateAccount => StatusCode::CONFLICT,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::LockedOut(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Config(_)
            | ApiError::Port(PortError::Unexpected(_))
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Credential(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::Pipeline(PipelineError::RateLimited { wait_secs }) => Some(*wait_secs),
            ApiError::LockedOut(locked) => Some(locked.retry_after_secs),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {:?}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if let Some(secs) = self.retry_after() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
