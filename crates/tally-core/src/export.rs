//! # Export Adapter
//!
//! Turns a batch or the current entry list into sheet rows and hands them to
//! a [`SheetWriter`]. Building the rows is a pure function of the input; the
//! writer decides where and how the file lands.
//!
//! ## Batch Sheet Layout
//! ```text
//! ┌───────────┬────────────┬───────┐
//! │ Batch 2   │            │       │   title
//! │ Date      │ 2024-01-01 │       │
//! │ Store     │ X          │       │
//! │ Discount  │ 10%        │       │
//! │           │            │       │   blank
//! │ Barcode   │ Quantity   │ Price │   column header
//! │ A1        │ 2          │ 0     │   one row per entry
//! └───────────┴────────────┴───────┘
//!   sheet "Batch 2", file batch_2.xlsx
//! ```
//!
//! The current-list sheet is just the column header plus entry rows, in
//! sheet `Entries` of `entries.xlsx`.

use crate::types::{Batch, Entry};

/// Column header row shared by both layouts.
pub const COLUMN_HEADERS: [&str; 3] = ["Barcode", "Quantity", "Price"];

/// Sheet and file name for the current list export.
pub const CURRENT_SHEET_NAME: &str = "Entries";
pub const CURRENT_FILE_NAME: &str = "entries.xlsx";

/// Rows above the column header in a batch sheet.
const BATCH_PREAMBLE_ROWS: usize = 5;

// =============================================================================
// Sheet Model
// =============================================================================

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// One sheet row; an empty row is a blank line.
pub type Row = Vec<Cell>;

/// A named single sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,

    /// Index of the `Barcode | Quantity | Price` row, for writers that style it.
    pub header_row: usize,
}

/// A sheet plus the file name it should be saved under.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFile {
    pub file_name: String,
    pub sheet: Sheet,
}

/// Spreadsheet writer capability.
pub trait SheetWriter {
    type Error;

    /// Writes a workbook holding only `sheet` under `file_name`.
    fn write(&mut self, sheet: &Sheet, file_name: &str) -> Result<(), Self::Error>;
}

// =============================================================================
// Row Builders
// =============================================================================

fn column_header() -> Row {
    COLUMN_HEADERS.iter().map(|h| Cell::from(*h)).collect()
}

fn entry_cells(entry: &Entry) -> Row {
    vec![
        Cell::text(entry.barcode.as_str()),
        Cell::Number(entry.quantity as f64),
        Cell::Number(entry.price.to_major()),
    ]
}

/// Builds the sheet for batch `ordinal` (1-based, as rendered).
pub fn batch_sheet(batch: &Batch, ordinal: usize) -> SheetFile {
    let mut rows = Vec::with_capacity(BATCH_PREAMBLE_ROWS + 1 + batch.entries.len());
    rows.push(vec![Cell::text(format!("Batch {}", ordinal))]);
    rows.push(vec![Cell::from("Date"), Cell::text(batch.header.date.as_str())]);
    rows.push(vec![Cell::from("Store"), Cell::text(batch.header.store.as_str())]);
    rows.push(vec![Cell::from("Discount"), Cell::text(batch.header.discount_label())]);
    rows.push(Vec::new());
    rows.push(column_header());
    rows.extend(batch.entries.iter().map(entry_cells));

    SheetFile {
        file_name: format!("batch_{}.xlsx", ordinal),
        sheet: Sheet {
            name: format!("Batch {}", ordinal),
            rows,
            header_row: BATCH_PREAMBLE_ROWS,
        },
    }
}

/// Builds the sheet for the current (unsaved) entry list.
pub fn current_sheet(entries: &[Entry]) -> SheetFile {
    let mut rows = Vec::with_capacity(1 + entries.len());
    rows.push(column_header());
    rows.extend(entries.iter().map(entry_cells));

    SheetFile {
        file_name: CURRENT_FILE_NAME.to_string(),
        sheet: Sheet {
            name: CURRENT_SHEET_NAME.to_string(),
            rows,
            header_row: 0,
        },
    }
}

// =============================================================================
// Export Operations
// =============================================================================

/// Writes batch `ordinal` through `writer` and returns the file name used.
pub fn export_batch<W: SheetWriter>(
    writer: &mut W,
    batch: &Batch,
    ordinal: usize,
) -> Result<String, W::Error> {
    let file = batch_sheet(batch, ordinal);
    writer.write(&file.sheet, &file.file_name)?;
    Ok(file.file_name)
}

/// Writes the current entry list through `writer` and returns the file name.
///
/// An empty list still produces a file holding the column header.
pub fn export_current<W: SheetWriter>(
    writer: &mut W,
    entries: &[Entry],
) -> Result<String, W::Error> {
    let file = current_sheet(entries);
    writer.write(&file.sheet, &file.file_name)?;
    Ok(file.file_name)
}
