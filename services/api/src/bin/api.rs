//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{BedrockSummaryAdapter, ChromiumRenderer, DbAdapter},
    config::{Config, ConfigError},
    error::ApiError,
    web::{router, spawn_sweeper, AppState},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool).with_starting_credits(config.starting_credits));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    let stale = db_adapter.clear_stale_reservations().await?;
    if stale > 0 {
        warn!("Cleared credit reservations left by a previous run on {} accounts", stale);
    }
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let renderer = Arc::new(ChromiumRenderer::new(
        config.browser_pool_size,
        config.settle,
        config.render_timeout,
        config.chrome_path.clone(),
    ));

    if config.bedrock_api_key.is_none() {
        warn!("BEDROCK_API_KEY is not set; model requests will be sent unauthenticated");
    }
    let summarizer = Arc::new(
        BedrockSummaryAdapter::new(
            config.summarizer_url(),
            config.bedrock_api_key.clone(),
            config.summary_timeout,
        )
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?,
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(db_adapter, renderer, summarizer, config.clone()));
    spawn_sweeper(app_state.clone());
    info!("Sweeping stale jobs and sessions every {:?}", config.sweep_interval);

    // --- 5. Create the Web Router ---
    let origin = config.client_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CLIENT_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let app = router(app_state).layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
