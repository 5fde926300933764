//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for account signup, login, and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::accounts::{authenticate, register, SignupForm};
use crate::error::ApiError;
use crate::web::middleware::{session_cookie, SESSION_COOKIE};
use crate::web::state::AppState;

pub const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub account_id: Uuid,
    pub username: String,
    pub email: String,
    pub credits: i64,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new account
///
/// Does not sign the new account in; the client logs in afterwards.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created successfully", body = AuthResponse),
        (status = 400, description = "Invalid signup form"),
        (status = 409, description = "Username or email already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let form = SignupForm {
        username: req.username,
        email: req.email,
        password: req.password,
        confirm_password: req.confirm_password,
    };
    let account = register(state.db.as_ref(), &form).await?;

    let response = AuthResponse {
        account_id: account.id,
        username: account.username,
        email: account.email,
        credits: account.credits,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many failed attempts, account temporarily locked"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Verify username and password
    let account_id =
        authenticate(state.db.as_ref(), &state.login_guard, &req.username, &req.password).await?;
    let account = state.db.get_account(account_id).await?;

    // 2. Create auth session in database
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .db
        .create_auth_session(&auth_session_id, account_id, expires_at)
        .await?;

    // 3. Open the session's rate limit and history
    state.sessions.open(&auth_session_id, account_id).await;
    info!(account_id = %account_id, "Session opened");

    // 4. Create session cookie
    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    );

    let response = AuthResponse {
        account_id,
        username: account.username,
        email: account.email,
        credits: account.credits,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
///
/// Also cancels any summaries still running for this session and discards its
/// history.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Parse session ID from cookie
    let auth_session_id = session_cookie(&headers).ok_or(ApiError::NotSignedIn)?;

    // 2. Delete auth session from database
    state.db.delete_auth_session(auth_session_id).await?;

    // 3. Tear down the in-memory session
    let cancelled = state.drop_session_jobs(auth_session_id);
    state.sessions.close(auth_session_id).await;
    info!(cancelled_jobs = cancelled, "Session closed");

    // 4. Clear cookie
    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}
