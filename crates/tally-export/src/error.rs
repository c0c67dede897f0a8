//! Export error types.

use rust_xlsxwriter::XlsxError;
use thiserror::Error;

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The sheet does not fit the workbook grid.
    #[error("sheet '{sheet}' too large: {reason}")]
    TooLarge { sheet: String, reason: String },
}
