//! Repository Module
//!
//! Free async functions over `&SqlitePool`. Handlers never touch SQL
//! directly; everything goes through these functions so error
//! classification stays in one place.

// Catalog
pub mod address;
pub mod product;

// Orders
pub mod order;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// SQLITE_BUSY or pool exhaustion. Retryable by the caller.
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut => RepoError::Busy("Connection pool timed out".into()),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                if db_err.is_unique_violation() {
                    RepoError::Duplicate(msg)
                } else if db_err.is_check_violation() {
                    RepoError::Validation(msg)
                } else if msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    // busy_timeout expired while another writer held the lock
                    RepoError::Busy(msg)
                } else {
                    RepoError::Database(msg)
                }
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
