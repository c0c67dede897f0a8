//! Storage errors.
//!
//! ```text
//! sqlx::Error ─────┐
//! MigrateError ────┼──► DbError ──► CliError (StorageError) ──► exit 5
//! serde_json ──────┘
//! ```
//!
//! Only [`DbError::Corrupt`] is expected in normal use: it means a stored
//! value no longer decodes, and the key is named so the user can fix it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A stored value failed to decode: bad JSON in `entries`/`batches`, an
    /// unknown `scanMode`, or a non-integer `entryIdSeq`.
    #[error("Stored value for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Could not encode value: {0}")]
    Encode(#[from] serde_json::Error),

    /// The database file could not be opened, or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free before the acquire timeout.
    #[error("Database is busy")]
    Busy,
}

impl DbError {
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("database is closed".into()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(e) => DbError::QueryFailed(e.message().to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
