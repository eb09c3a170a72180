// Credential store contract and the Postgres-backed implementation

use crate::accounts::{
    error::AccountError,
    models::{Account, NewAccount, Role},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, is_verified, \
     verification_token, reset_password_token, reset_password_expires, created_at, updated_at";

/// Persistence contract for account records.
///
/// Uniqueness of emails and tokens is the store's responsibility; the state
/// machine never pre-checks uniqueness itself. The `consume_*` operations
/// pair the lookup with the clearing write in a single atomic step, so a
/// token can be consumed by exactly one caller.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a new account in the unverified state.
    /// Fails with `EmailTaken` when the email is already registered.
    async fn create(&self, record: NewAccount) -> Result<Account, AccountError>;

    /// Find an account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    /// Find an account by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError>;

    /// Persist mutable fields of an existing account
    async fn save(&self, account: &Account) -> Result<Account, AccountError>;

    /// Atomically look up an account by its pending verification token,
    /// mark it verified, and clear the token. Returns `None` when no
    /// account holds the token (including when it was already consumed).
    async fn consume_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountError>;

    /// Attach a reset token and its absolute expiry to an account
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), AccountError>;

    /// Clear a pending reset token and its expiry
    async fn clear_reset_token(&self, id: Uuid) -> Result<(), AccountError>;

    /// Atomically look up an account by an unexpired reset token, replace
    /// its password hash, and clear both reset fields. Returns `None` when
    /// the token is unknown, already consumed, or expired.
    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
    ) -> Result<Option<Account>, AccountError>;
}

/// Postgres-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new PgCredentialStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, record: NewAccount) -> Result<Account, AccountError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (id, name, email, password_hash, role, is_verified, verification_token) \
             VALUES ($1, $2, $3, $4, $5, FALSE, $6) \
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(Role::User)
        .bind(&record.verification_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // The unique index is the source of truth for email uniqueness
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AccountError::EmailTaken;
                }
            }
            AccountError::Store(e.to_string())
        })?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE LOWER(email) = LOWER($1)",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(account)
    }

    async fn save(&self, account: &Account) -> Result<Account, AccountError> {
        let saved = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts \
             SET name = $2, password_hash = $3, role = $4, is_verified = $5, \
                 verification_token = $6, reset_password_token = $7, \
                 reset_password_expires = $8, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(account.is_verified)
        .bind(&account.verification_token)
        .bind(&account.reset_password_token)
        .bind(account.reset_password_expires)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(saved)
    }

    async fn consume_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountError> {
        // Single conditional UPDATE: concurrent attempts on the same token
        // admit exactly one winner, the loser sees no matching row.
        let account = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts \
             SET is_verified = TRUE, verification_token = NULL, updated_at = NOW() \
             WHERE verification_token = $1 \
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(account)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        sqlx::query(
            "UPDATE accounts \
             SET reset_password_token = $2, reset_password_expires = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> Result<(), AccountError> {
        sqlx::query(
            "UPDATE accounts \
             SET reset_password_token = NULL, reset_password_expires = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
    ) -> Result<Option<Account>, AccountError> {
        // Expiry is checked lazily here; expired tokens never match.
        let account = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts \
             SET password_hash = $2, reset_password_token = NULL, \
                 reset_password_expires = NULL, updated_at = NOW() \
             WHERE reset_password_token = $1 AND reset_password_expires > NOW() \
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::Store(e.to_string()))?;

        Ok(account)
    }
}
