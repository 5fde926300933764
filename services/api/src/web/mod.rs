pub mod auth;
pub mod jobs;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::{spawn_sweeper, AppState};

/// Builds the full HTTP router: public auth routes plus the routes that need
/// a valid session cookie.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/account", get(rest::get_account_handler))
        .route("/history", get(rest::list_history_handler))
        .route("/summaries", post(jobs::submit_summary_handler))
        .route("/summaries/jobs/{id}", get(jobs::get_job_handler))
        .route("/summaries/jobs/{id}/cancel", post(jobs::cancel_job_handler))
        .route("/summaries/jobs/{id}/download", get(jobs::download_job_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
