//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;
use web_summarizer_core::{PipelineSettings, RateLimiter};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub client_origin: String,

    // --- Pipeline ---
    pub max_content_length: usize,
    pub rate_limit_per_minute: u32,
    pub history_limit: usize,
    pub starting_credits: i64,
    /// How long a finished job stays pollable before it is swept.
    pub job_retention: Duration,
    pub sweep_interval: Duration,

    // --- Renderer ---
    pub settle: Duration,
    pub render_timeout: Duration,
    pub browser_pool_size: usize,
    pub chrome_path: Option<PathBuf>,

    // --- Model endpoint ---
    pub aws_region: String,
    pub model_id: String,
    pub bedrock_api_key: Option<String>,
    pub summarizer_endpoint: Option<String>,
    pub summary_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "sqlite://summaries.db?mode=rwc".to_string(),
            log_level: Level::INFO,
            client_origin: "http://localhost:3000".to_string(),
            max_content_length: 100_000,
            rate_limit_per_minute: 10,
            history_limit: 5,
            starting_credits: 500,
            job_retention: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            settle: Duration::from_secs(5),
            render_timeout: Duration::from_secs(60),
            browser_pool_size: 2,
            chrome_path: None,
            aws_region: "eu-north-1".to_string(),
            model_id: "eu.anthropic.claude-3-7-sonnet-20250219-v1:0".to_string(),
            bedrock_api_key: None,
            summarizer_endpoint: None,
            summary_timeout: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        // --- Load Server and Database Settings ---
        let bind_address = parsed_var("BIND_ADDRESS", defaults.bind_address)?;
        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;
        let client_origin = std::env::var("CLIENT_ORIGIN").unwrap_or(defaults.client_origin);

        // --- Load Pipeline Settings ---
        let max_content_length = parsed_var("MAX_CONTENT_LENGTH", defaults.max_content_length)?;
        let rate_limit_per_minute = parsed_var("RATE_LIMIT", defaults.rate_limit_per_minute)?;
        if rate_limit_per_minute == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT".to_string(),
                "must be at least 1 request per minute".to_string(),
            ));
        }
        let history_limit = parsed_var("HISTORY_LIMIT", defaults.history_limit)?;
        let starting_credits = parsed_var("STARTING_CREDITS", defaults.starting_credits)?;
        let job_retention =
            Duration::from_secs(parsed_var("JOB_RETENTION_SECS", defaults.job_retention.as_secs())?);
        let sweep_interval =
            Duration::from_secs(parsed_var("SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs())?);
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be at least 1 second".to_string(),
            ));
        }

        // --- Load Renderer Settings ---
        let settle = Duration::from_secs(parsed_var("SETTLE_SECS", defaults.settle.as_secs())?);
        let render_timeout =
            Duration::from_secs(parsed_var("RENDER_TIMEOUT_SECS", defaults.render_timeout.as_secs())?);
        let browser_pool_size = parsed_var("BROWSER_POOL_SIZE", defaults.browser_pool_size)?;
        if browser_pool_size == 0 {
            return Err(ConfigError::InvalidValue(
                "BROWSER_POOL_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let chrome_path = std::env::var("CHROME_PATH").ok().map(PathBuf::from);

        // --- Load Model Endpoint Settings ---
        let aws_region = std::env::var("AWS_REGION").unwrap_or(defaults.aws_region);
        let model_id = std::env::var("MODEL_ID").unwrap_or(defaults.model_id);
        let bedrock_api_key = std::env::var("BEDROCK_API_KEY")
            .or_else(|_| std::env::var("AWS_BEARER_TOKEN_BEDROCK"))
            .ok();
        let summarizer_endpoint = std::env::var("SUMMARIZER_ENDPOINT").ok();
        let summary_timeout =
            Duration::from_secs(parsed_var("SUMMARY_TIMEOUT_SECS", defaults.summary_timeout.as_secs())?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            client_origin,
            max_content_length,
            rate_limit_per_minute,
            history_limit,
            starting_credits,
            job_retention,
            sweep_interval,
            settle,
            render_timeout,
            browser_pool_size,
            chrome_path,
            aws_region,
            model_id,
            bedrock_api_key,
            summarizer_endpoint,
            summary_timeout,
        })
    }

    /// Minimum spacing between accepted requests in one session.
    pub fn min_request_interval(&self) -> Duration {
        RateLimiter::per_minute(self.rate_limit_per_minute).min_interval()
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_content_length: self.max_content_length,
        }
    }

    /// The Bedrock `invoke` URL, unless `SUMMARIZER_ENDPOINT` overrides it.
    pub fn summarizer_url(&self) -> String {
        self.summarizer_endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://bedrock-runtime.{}.amazonaws.com/model/{}/invoke",
                self.aws_region, self.model_id
            )
        })
    }
}

fn parsed_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_content_length, 100_000);
        assert_eq!(config.rate_limit_per_minute, 10);
        assert_eq!(config.min_request_interval(), Duration::from_secs(6));
        assert_eq!(config.settle, Duration::from_secs(5));
        assert_eq!(config.job_retention, Duration::from_secs(3600));
    }

    #[test]
    fn summarizer_url_is_built_from_region_and_model() {
        let config = Config::default();
        assert_eq!(
            config.summarizer_url(),
            "https://bedrock-runtime.eu-north-1.amazonaws.com/model/eu.anthropic.claude-3-7-sonnet-20250219-v1:0/invoke"
        );

        let overridden = Config {
            summarizer_endpoint: Some("http://127.0.0.1:9000/invoke".to_string()),
            ..Config::default()
        };
        assert_eq!(overridden.summarizer_url(), "http://127.0.0.1:9000/invoke");
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: usize = parsed_var("WEB_SUMMARIZER_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
