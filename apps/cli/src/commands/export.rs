//! # Export Commands
//!
//! Batch exports are named `batch_<n>.xlsx` after the ordinal as listed;
//! the current list goes to `entries.xlsx`. Existing files are overwritten.

use std::io::Write;

use tally_core::export;
use tally_export::XlsxSheetWriter;

use crate::commands::ordinal_index;
use crate::error::CliResult;
use crate::state::Session;

pub fn export_batch(
    session: &Session,
    writer: &mut XlsxSheetWriter,
    out: &mut dyn Write,
    ordinal: usize,
) -> CliResult<()> {
    let index = ordinal_index(ordinal, session.batches().len())?;
    let batch = session.batch(index)?;

    let file = export::export_batch(writer, batch, ordinal)?;
    writeln!(out, "Exported {}", writer.output_dir().join(file).display())?;
    Ok(())
}

/// Exports the current (unsaved) list; an empty list still writes the
/// column header.
pub fn export_current(
    session: &Session,
    writer: &mut XlsxSheetWriter,
    out: &mut dyn Write,
) -> CliResult<()> {
    let file = export::export_current(writer, session.entries().list())?;
    writeln!(out, "Exported {}", writer.output_dir().join(file).display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::commands::entries::tests::session;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_export_batch_by_ordinal() {
        let (_db, mut s) = session().await;
        for code in ["A1", "B2"] {
            s.record_scan(code).await.unwrap();
            s.finalize().await.unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let mut writer = XlsxSheetWriter::new(dir.path());

        let mut out = Vec::new();
        export_batch(&s, &mut writer, &mut out, 2).unwrap();

        assert!(dir.path().join("batch_2.xlsx").exists());
        assert!(!dir.path().join("batch_1.xlsx").exists());
        assert!(String::from_utf8(out).unwrap().contains("batch_2.xlsx"));

        let err = export_batch(&s, &mut writer, &mut Vec::new(), 3).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_export_current_even_when_empty() {
        let (_db, s) = session().await;
        let dir = tempfile::tempdir().unwrap();
        let mut writer = XlsxSheetWriter::new(dir.path());

        export_current(&s, &mut writer, &mut Vec::new()).unwrap();
        assert!(dir.path().join("entries.xlsx").exists());
    }
}
