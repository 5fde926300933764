//! services/api/src/lib.rs
//!
//! The `api` service: SQLite account storage, the Chromium and Bedrock
//! adapters, and the axum web surface around the summarization pipeline.

pub mod accounts;
pub mod adapters;
pub mod config;
pub mod credentials;
pub mod error;
pub mod web;
