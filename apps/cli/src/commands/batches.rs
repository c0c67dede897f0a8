//! # Batch Commands

use std::io::Write;

use tally_core::render::render_batches;
use tally_core::Confirm;

use crate::commands::ordinal_index;
use crate::error::CliResult;
use crate::state::Session;

/// Moves the current list into a new batch under the stored header.
pub async fn finalize(session: &mut Session, out: &mut dyn Write) -> CliResult<()> {
    let batch = session.finalize().await?;
    writeln!(
        out,
        "Saved Batch {} ({} entries, Total Qty: {})",
        session.batches().len(),
        batch.entries.len(),
        batch.total_quantity()
    )?;
    Ok(())
}

pub fn list_batches(session: &Session, out: &mut dyn Write) -> CliResult<()> {
    let batches = session.batches().list();
    if batches.is_empty() {
        writeln!(out, "No batches.")?;
        return Ok(());
    }

    for row in render_batches(batches) {
        writeln!(out, "{}", row)?;
    }
    Ok(())
}

/// Deletes batch `ordinal` (1-based, as listed) after confirmation.
pub async fn delete(
    session: &mut Session,
    out: &mut dyn Write,
    ordinal: usize,
    confirm: &mut dyn Confirm,
) -> CliResult<()> {
    let index = ordinal_index(ordinal, session.batches().len())?;

    match session.delete_batch(index, confirm).await? {
        Some(_) => writeln!(out, "Deleted Batch {}.", ordinal)?,
        None => writeln!(out, "Cancelled.")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{BatchHeader, FixedAnswer};

    use crate::commands::entries::tests::session;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_finalize_then_list() {
        let (db, mut s) = session().await;
        db.storage()
            .save_header(&BatchHeader::new("2024-01-01", "X", "10"))
            .await
            .unwrap();
        s.record_scan("A1").await.unwrap();
        s.record_scan("A1").await.unwrap();

        let mut out = Vec::new();
        finalize(&mut s, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Saved Batch 1 (1 entries, Total Qty: 2)\n"
        );

        let mut out = Vec::new();
        list_batches(&s, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Batch 1 - 2024-01-01 - X - Discount: 10% - Total Qty: 2\n"
        );
    }

    #[tokio::test]
    async fn test_finalize_empty_writes_nothing() {
        let (_db, mut s) = session().await;
        let mut out = Vec::new();

        let err = finalize(&mut s, &mut out).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToSave);
        assert!(out.is_empty());
        assert!(s.batches().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_ordinal() {
        let (_db, mut s) = session().await;
        s.record_scan("A1").await.unwrap();
        s.finalize().await.unwrap();

        let mut out = Vec::new();
        let err = delete(&mut s, &mut out, 0, &mut FixedAnswer(true)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = delete(&mut s, &mut out, 2, &mut FixedAnswer(true)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        delete(&mut s, &mut out, 1, &mut FixedAnswer(true)).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Deleted Batch 1.\n");
        assert!(s.batches().is_empty());
    }
}
