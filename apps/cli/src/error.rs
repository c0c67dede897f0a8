//! # CLI Error Type
//!
//! Unified error type for every command.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Command Function ── CliResult<()>                                      │
//! │         │                                                               │
//! │         ├── CoreError::NothingToFinalize ───► NOTHING_TO_SAVE   (3)    │
//! │         ├── CoreError::BatchNotFound ───────► NOT_FOUND         (4)    │
//! │         ├── ValidationError ────────────────► VALIDATION_ERROR  (2)    │
//! │         ├── DbError ────────────────────────► STORAGE_ERROR     (5)    │
//! │         ├── CaptureError ───────────────────► CAPTURE_ERROR     (6)    │
//! │         ├── ExportError ────────────────────► EXPORT_ERROR      (7)    │
//! │         └── ConfigError ────────────────────► CONFIG_ERROR      (8)    │
//! │                                                                         │
//! │  main ──► "error: <message>" on stderr (or JSON with --json)            │
//! │       ──► process exit code                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_capture::CaptureError;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;
use tally_export::ExportError;

use crate::config::ConfigError;

/// Result type alias for commands.
pub type CliResult<T> = Result<T, CliError>;

/// Error reported by a command.
///
/// ## Serialization
/// With `--json` this is what lands on stderr:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Batch 3 not found (2 batches saved)"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A batch ordinal does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Finalize with an empty entry list
    NothingToSave,

    /// Storage read or write failed, or stored state is corrupt
    StorageError,

    /// Capture device or decoder failure
    CaptureError,

    /// Spreadsheet could not be written
    ExportError,

    /// Configuration file or environment is invalid
    ConfigError,

    /// Terminal I/O failed
    Internal,
}

impl ErrorCode {
    /// Process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            ErrorCode::Internal => 1,
            ErrorCode::ValidationError => 2,
            ErrorCode::NothingToSave => 3,
            ErrorCode::NotFound => 4,
            ErrorCode::StorageError => 5,
            ErrorCode::CaptureError => 6,
            ErrorCode::ExportError => 7,
            ErrorCode::ConfigError => 8,
        }
    }
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Internal, message)
    }

    /// JSON form for `--json`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NothingToFinalize => CliError::new(ErrorCode::NothingToSave, err.to_string()),
            CoreError::BatchNotFound { .. } => CliError::new(ErrorCode::NotFound, err.to_string()),
            CoreError::Validation(e) => CliError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::validation(err.to_string())
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Corrupt { .. } => CliError::new(ErrorCode::StorageError, err.to_string()),
            DbError::ConnectionFailed(_) | DbError::MigrationFailed(_) => {
                tracing::error!(error = %err, "Storage unavailable");
                CliError::new(ErrorCode::StorageError, err.to_string())
            }
            other => {
                tracing::error!(error = %other, "Storage operation failed");
                CliError::new(ErrorCode::StorageError, "Storage operation failed")
            }
        }
    }
}

impl From<CaptureError> for CliError {
    fn from(err: CaptureError) -> Self {
        CliError::new(ErrorCode::CaptureError, err.to_string())
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        CliError::new(ErrorCode::ExportError, err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::internal(format!("Terminal I/O failed: {}", err))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}
