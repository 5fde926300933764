//! services/api/src/bin/summarize.rs
//!
//! One-shot command line session: sign in, summarize one URL, save the result.

use api_lib::{
    accounts::{authenticate, register, SignupForm},
    adapters::{BedrockSummaryAdapter, ChromiumRenderer, DbAdapter},
    config::Config,
    error::ApiError,
};
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_summarizer_core::{LoginGuard, SessionContext, SummaryPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize a web page with your account credits", long_about = None)]
struct Args {
    /// Account username
    #[arg(short = 'n', long)]
    username: String,

    /// Account password
    #[arg(short, long)]
    password: String,

    /// URL of the page to summarize
    #[arg(short, long)]
    url: String,

    /// Directory the summary text file is written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Create the account before signing in
    #[arg(long, requires = "email")]
    signup: bool,

    /// Email address for --signup
    #[arg(short, long)]
    email: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Parse Arguments, Load Configuration & Set Up Logging ---
    let args = Args::parse();
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- 2. Connect to Database ---
    let db_pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    let db = Arc::new(DbAdapter::new(db_pool).with_starting_credits(config.starting_credits));
    db.run_migrations().await?;

    // --- 3. Sign Up / Sign In ---
    if args.signup {
        let form = SignupForm {
            username: args.username.clone(),
            email: args.email.clone().unwrap_or_default(),
            password: args.password.clone(),
            confirm_password: args.password.clone(),
        };
        register(db.as_ref(), &form).await?;
        println!("Account created! Signing in...");
    }
    let guard = Mutex::new(LoginGuard::default());
    let account_id = authenticate(db.as_ref(), &guard, &args.username, &args.password).await?;

    // --- 4. Build the Pipeline ---
    let renderer = Arc::new(ChromiumRenderer::new(
        1,
        config.settle,
        config.render_timeout,
        config.chrome_path.clone(),
    ));
    let summarizer = Arc::new(
        BedrockSummaryAdapter::new(
            config.summarizer_url(),
            config.bedrock_api_key.clone(),
            config.summary_timeout,
        )
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?,
    );
    let pipeline = SummaryPipeline::new(renderer, summarizer, db.clone(), config.pipeline_settings());
    let session = Mutex::new(SessionContext::new(account_id, config.min_request_interval()));

    // Ctrl-C cancels the run and releases the held credit.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling summary");
            on_interrupt.cancel();
        }
    });

    // --- 5. Run & Save ---
    let outcome = pipeline.run(&session, &args.url, &cancel).await?;

    for notice in &outcome.notices {
        eprintln!("Warning: {}", notice);
    }
    println!("{}", outcome.summary);
    println!();
    println!("Remaining credits: {}", outcome.remaining_credits);

    tokio::fs::create_dir_all(&args.output).await?;
    let path = args.output.join(&outcome.download_name);
    tokio::fs::write(&path, &outcome.summary).await?;
    info!("Summary saved to {}", path.display());
    println!("Saved to {}", path.display());

    Ok(())
}
