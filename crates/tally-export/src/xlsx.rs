//! # Xlsx Writer
//!
//! ```text
//! Sheet { name, rows, header_row }
//!        │
//!        ▼
//! Workbook ── add_worksheet ── set_name(name)
//!        │     Cell::Text   → write_string   (bold on header_row)
//!        │     Cell::Number → write_number
//!        ▼
//! <output_dir>/<file_name>
//! ```

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tally_core::export::{Cell, Sheet, SheetWriter};
use tracing::{debug, info};

use crate::error::{ExportError, ExportResult};

/// Saves each sheet as its own workbook under `output_dir`.
#[derive(Debug, Clone)]
pub struct XlsxSheetWriter {
    output_dir: PathBuf,
    last_written: Option<PathBuf>,
}

impl XlsxSheetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        XlsxSheetWriter {
            output_dir: output_dir.into(),
            last_written: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full path of the most recent successful write.
    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

fn grid_position(sheet: &Sheet, row: usize, col: usize) -> ExportResult<(u32, u16)> {
    let too_large = |reason: String| ExportError::TooLarge {
        sheet: sheet.name.clone(),
        reason,
    };
    let row = u32::try_from(row).map_err(|_| too_large(format!("row {}", row)))?;
    let col = u16::try_from(col).map_err(|_| too_large(format!("column {}", col)))?;
    Ok((row, col))
}

fn write_rows(worksheet: &mut Worksheet, sheet: &Sheet) -> ExportResult<()> {
    let header_format = Format::new().set_bold();

    for (r, cells) in sheet.rows.iter().enumerate() {
        for (c, cell) in cells.iter().enumerate() {
            let (row, col) = grid_position(sheet, r, c)?;
            match cell {
                Cell::Text(text) if r == sheet.header_row => {
                    worksheet.write_string_with_format(row, col, text, &header_format)?;
                }
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row, col, *value)?;
                }
            }
        }
    }

    Ok(())
}

impl SheetWriter for XlsxSheetWriter {
    type Error = ExportError;

    fn write(&mut self, sheet: &Sheet, file_name: &str) -> ExportResult<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut workbook = Workbook::new();
        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            write_rows(worksheet, sheet)?;
        }

        let path = self.output_dir.join(file_name);
        workbook.save(&path)?;

        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Sheet written");
        info!(path = %path.display(), "Workbook saved");
        self.last_written = Some(path);
        Ok(())
    }
}
