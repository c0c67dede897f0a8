//! Errors raised by the entry and batch stores.
//!
//! ```text
//!   ValidationError ──► CoreError ──► CliError ──► stderr, exit code
//! ```
//!
//! A declined confirmation is not an error. `clear` and `remove` report it
//! through their return value and change nothing.

use thiserror::Error;

/// A refused store operation. The stores are unchanged afterwards.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("No entries to save!")]
    NothingToFinalize,

    /// `ordinal` is 1-based, as shown in the batch list. Typically a stale
    /// ordinal used after another batch was deleted.
    #[error("Batch {ordinal} not found ({count} batches saved)")]
    BatchNotFound { ordinal: usize, count: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// From a 0-based index.
    pub fn batch_not_found(index: usize, count: usize) -> Self {
        CoreError::BatchNotFound {
            ordinal: index + 1,
            count,
        }
    }
}

/// Rejected user input. `field` is the label the user typed against.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;
