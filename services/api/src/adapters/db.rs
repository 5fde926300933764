//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AccountStore` and `CreditLedger` ports from the `core` crate. It handles
//! all interactions with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;
use web_summarizer_core::domain::{Account, AccountCredentials, Reservation};
use web_summarizer_core::ports::{AccountStore, CreditLedger, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AccountStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
    starting_credits: i64,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`. New accounts start with 500 credits.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            starting_credits: 500,
        }
    }

    pub fn with_starting_credits(mut self, credits: i64) -> Self {
        self.starting_credits = credits;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Reservations only live as long as the process that made them; any left
    /// over from a previous run are dropped.
    ///
    /// This is also the only place a reservation whose `commit` failed gets
    /// released. The pipeline logs such failures and does not retry, so the
    /// account shows one credit fewer available until the next startup.
    pub async fn clear_stale_reservations(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET reserved = 0 WHERE reserved <> 0")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    username: String,
    email: String,
    credits: i64,
    created_at: DateTime<Utc>,
}
impl AccountRecord {
    fn to_domain(self) -> Account {
        Account {
            id: self.id,
            username: self.username,
            email: self.email,
            credits: self.credits,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> AccountCredentials {
        AccountCredentials {
            account_id: self.id,
            username: self.username,
            password_hash: self.password_hash,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn account_not_found(account_id: Uuid) -> PortError {
    PortError::NotFound(format!("Account {} not found", account_id))
}

//=========================================================================================
// `CreditLedger` Trait Implementation
//=========================================================================================

#[async_trait]
impl CreditLedger for DbAdapter {
    async fn get_balance(&self, account_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT credits FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| account_not_found(account_id))
    }

    async fn get_available(&self, account_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT credits - reserved FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| account_not_found(account_id))
    }

    async fn deduct(&self, account_id: Uuid, amount: i64) -> PortResult<()> {
        let result = sqlx::query("UPDATE accounts SET credits = credits - ? WHERE id = ?")
            .bind(amount)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(account_not_found(account_id));
        }
        Ok(())
    }

    async fn reserve(&self, account_id: Uuid) -> PortResult<Reservation> {
        // Check and hold in one statement, so concurrent requests cannot both pass.
        let result = sqlx::query(
            "UPDATE accounts SET reserved = reserved + 1 WHERE id = ? AND credits - reserved > 0",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 1 {
            return Ok(Reservation { account_id });
        }
        // Distinguish an unknown account from an empty one.
        self.get_balance(account_id).await?;
        Err(PortError::InsufficientCredits)
    }

    async fn commit(&self, reservation: Reservation) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE accounts SET credits = credits - 1, reserved = reserved - 1 \
             WHERE id = ? AND reserved > 0 RETURNING credits",
        )
        .bind(reservation.account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| {
            PortError::Unexpected(format!(
                "No credit reservation held for account {}",
                reservation.account_id
            ))
        })
    }

    async fn release(&self, reservation: Reservation) -> PortResult<()> {
        sqlx::query("UPDATE accounts SET reserved = reserved - 1 WHERE id = ? AND reserved > 0")
            .bind(reservation.account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<Account> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO accounts (id, username, email, password_hash, credits, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING id, username, email, credits, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(self.starting_credits)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Duplicate(db.message().to_string())
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_account(&self, account_id: Uuid) -> PortResult<Account> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT id, username, email, credits, created_at FROM accounts WHERE id = ?",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => account_not_found(account_id),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<AccountCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash FROM accounts WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", username)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, account_id, expires_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(account_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT account_id, expires_at FROM auth_sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match row {
            Some((account_id, expires_at)) if expires_at > Utc::now() => Ok(account_id),
            Some(_) => {
                self.delete_auth_session(session_id).await?;
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
