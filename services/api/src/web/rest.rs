//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the account and history endpoints and the
//! master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::middleware::AuthContext;
use crate::web::protocol::{
    AccountResponse, HistoryItem, HistoryQuery, JobResponse, SubmitResponse, SummarizeRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use std::sync::Arc;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::jobs::submit_summary_handler,
        crate::web::jobs::get_job_handler,
        crate::web::jobs::cancel_job_handler,
        crate::web::jobs::download_job_handler,
        get_account_handler,
        list_history_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            SummarizeRequest,
            SubmitResponse,
            JobResponse,
            HistoryItem,
            AccountResponse
        )
    ),
    tags(
        (name = "Web Summarizer API", description = "Summarize web pages with a credit-metered LLM.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Current account and credit balance.
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "The signed-in account", body = AccountResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.db.get_account(auth.account_id).await?;
    let available_credits = state.ledger.get_available(auth.account_id).await?;
    Ok(Json(AccountResponse {
        account_id: account.id,
        username: account.username,
        email: account.email,
        credits: account.credits,
        available_credits,
    }))
}

/// Recent summaries made in this session, newest first.
///
/// History lives only as long as the session; it is discarded on logout.
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recent summaries", body = Vec<HistoryItem>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryItem>> {
    let limit = query.limit.unwrap_or(state.config.history_limit);
    let entries = match state.sessions.get(&auth.session_id).await {
        Some(context) => context.lock().await.history.recent(limit),
        None => Vec::new(),
    };
    Json(entries.into_iter().map(HistoryItem::from).collect())
}
