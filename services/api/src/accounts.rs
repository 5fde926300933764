//! services/api/src/accounts.rs
//!
//! Account registration and sign-in on top of the `AccountStore` port.

use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use web_summarizer_core::{Account, AccountStore, LoginGuard, PortError};

use crate::credentials::{hash_password, verify_password};
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// The fields collected by the sign-up form.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub fn validate_signup(form: &SignupForm) -> Result<(), ApiError> {
    if form.username.trim().is_empty() || form.email.trim().is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".to_string()));
    }
    if form.password != form.confirm_password {
        return Err(ApiError::Validation("Passwords do not match!".to_string()));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters long!",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Validates the form, hashes the password and creates the account.
pub async fn register(store: &dyn AccountStore, form: &SignupForm) -> Result<Account, ApiError> {
    validate_signup(form)?;

    let password = form.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let account = store
        .create_account(form.username.trim(), form.email.trim(), &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Duplicate(detail) => {
                warn!("Signup rejected, duplicate account: {}", detail);
                ApiError::DuplicateAccount
            }
            other => ApiError::Port(other),
        })?;

    info!(account_id = %account.id, username = %account.username, "Account created");
    Ok(account)
}

/// Checks a username and password, returning the account id on success.
///
/// Unknown usernames and wrong passwords are indistinguishable to the caller.
/// Both count towards the lockout for that username.
pub async fn authenticate(
    store: &dyn AccountStore,
    guard: &Mutex<LoginGuard>,
    username: &str,
    password: &str,
) -> Result<Uuid, ApiError> {
    let username = username.trim();
    guard.lock().await.check(username, Instant::now()).map_err(|locked| {
        warn!(username, retry_after_secs = locked.retry_after_secs, "Sign-in refused, account locked");
        ApiError::LockedOut(locked)
    })?;

    let credentials = match store.get_credentials_by_username(username).await {
        Ok(credentials) => Some(credentials),
        Err(PortError::NotFound(_)) => None,
        Err(e) => return Err(ApiError::Port(e)),
    };

    let verified = match &credentials {
        Some(credentials) => {
            let password = password.to_string();
            let stored = credentials.password_hash.clone();
            tokio::task::spawn_blocking(move || verify_password(&password, &stored))
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))??
        }
        None => false,
    };

    match credentials {
        Some(credentials) if verified => {
            guard.lock().await.record_success(username);
            info!(account_id = %credentials.account_id, "Sign-in succeeded");
            Ok(credentials.account_id)
        }
        _ => {
            guard.lock().await.record_failure(username, Instant::now());
            warn!(username, "Sign-in failed");
            Err(ApiError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn accepts_a_valid_form() {
        assert!(validate_signup(&form("longenough", "longenough")).is_ok());
    }

    #[test]
    fn rejects_mismatched_confirmation() {
        let err = validate_signup(&form("longenough", "different1")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(msg) if msg.contains("do not match")));
    }

    #[test]
    fn rejects_short_passwords() {
        let err = validate_signup(&form("short", "short")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(msg) if msg.contains("at least 8")));
    }

    #[test]
    fn rejects_blank_fields() {
        let mut blank = form("longenough", "longenough");
        blank.email = "   ".to_string();
        assert!(matches!(validate_signup(&blank), Err(ApiError::Validation(_))));
    }
}
