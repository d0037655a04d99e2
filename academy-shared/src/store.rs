/// Credential store
///
/// The authentication flow only needs a handful of account operations. They
/// sit behind the [`AccountStore`] trait so the flow can run against
/// PostgreSQL in production and against an in-memory store in tests.
///
/// Unique-constraint violations are reported as [`StoreError::Conflict`]
/// naming the clashing field; callers treat that as authoritative even when
/// they already checked for duplicates beforehand.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::account::{Account, CreateAccount};
use crate::models::vendor::Vendor;

/// Error type for credential store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Email or phone already in use
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Maps a unique violation to the account field it protects
///
/// Returns `None` for any other error.
pub fn unique_violation_field(err: &sqlx::Error) -> Option<&'static str> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };

    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.constraint() {
        Some(c) if c.contains("email") => Some("email"),
        Some(c) if c.contains("phone") => Some("phone"),
        Some(c) if c.contains("invoice") => Some("invoice"),
        Some(c) if c.contains("account_event") => Some("event log"),
        _ => Some("record"),
    }
}

impl StoreError {
    /// Wraps a database error, turning unique violations into conflicts
    pub fn from_db(err: sqlx::Error) -> Self {
        match unique_violation_field(&err) {
            Some(field) => StoreError::Conflict(field),
            None => StoreError::Database(err),
        }
    }
}

/// Account persistence used by registration and login
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, data: CreateAccount) -> Result<Account, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError>;

    /// Stores a device push token; false if the account doesn't exist
    async fn update_fcm_token(&self, id: i64, token: &str) -> Result<bool, StoreError>;

    /// Whether a live academy with this id exists
    async fn vendor_exists(&self, vendor_id: i64) -> Result<bool, StoreError>;
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, data: CreateAccount) -> Result<Account, StoreError> {
        Account::create(&self.pool, data)
            .await
            .map_err(StoreError::from_db)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(Account::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(Account::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, StoreError> {
        Ok(Account::find_by_phone(&self.pool, phone).await?)
    }

    async fn update_fcm_token(&self, id: i64, token: &str) -> Result<bool, StoreError> {
        Ok(Account::update_fcm_token(&self.pool, id, token).await?)
    }

    async fn vendor_exists(&self, vendor_id: i64) -> Result<bool, StoreError> {
        Ok(Vendor::exists(&self.pool, vendor_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        assert_eq!(unique_violation_field(&sqlx::Error::RowNotFound), None);
        assert!(matches!(
            StoreError::from_db(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn test_conflict_message() {
        assert_eq!(StoreError::Conflict("email").to_string(), "email already exists");
    }
}
