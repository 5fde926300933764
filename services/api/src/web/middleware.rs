//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use web_summarizer_core::PortError;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Who is making the request, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub session_id: String,
}

/// Reads the auth session id out of the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// Middleware that validates the auth session cookie.
///
/// If valid, inserts an `AuthContext` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Parse session ID from cookie
    let session_id = session_cookie(req.headers())
        .ok_or(ApiError::NotSignedIn)?
        .to_string();

    // 2. Validate auth session in database, get account_id
    let account_id = match state.db.validate_auth_session(&session_id).await {
        Ok(account_id) => account_id,
        Err(e @ PortError::Unexpected(_)) => return Err(ApiError::Port(e)),
        Err(e) => {
            warn!("Rejected auth session: {:?}", e);
            // The session is gone for good, so is anything opened under it.
            let dropped = state.drop_session_jobs(&session_id);
            if state.sessions.close(&session_id).await || dropped > 0 {
                info!(dropped_jobs = dropped, "Closed context of an expired session");
            }
            return Err(ApiError::NotSignedIn);
        }
    };

    // 3. Insert the context into request extensions
    req.extensions_mut().insert(AuthContext {
        account_id,
        session_id,
    });

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc123; lang=en"));
        assert_eq!(session_cookie(&headers), Some("abc123"));
    }

    #[test]
    fn ignores_similarly_named_and_empty_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("my_session=nope; session="));
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }
}
