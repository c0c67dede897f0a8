//! # tally-export: Spreadsheet Writer for Tally
//!
//! [`XlsxSheetWriter`] implements [`tally_core::export::SheetWriter`] on top
//! of `rust_xlsxwriter`. Every export is a single-sheet workbook saved into
//! one output directory, overwriting any earlier file of the same name.
//!
//! ```rust,ignore
//! use tally_core::export::export_batch;
//! use tally_export::XlsxSheetWriter;
//!
//! let mut writer = XlsxSheetWriter::new("./exports");
//! let file = export_batch(&mut writer, &batch, 1)?; // "batch_1.xlsx"
//! ```

pub mod error;
pub mod xlsx;

pub use error::{ExportError, ExportResult};
pub use xlsx::XlsxSheetWriter;
