//! # Session State
//!
//! The entry list and the batch list of one run, plus the storage they were
//! loaded from. Every mutation writes the affected store back before it
//! returns, so the stored copy always matches what was last shown.
//!
//! ## Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Command               Store Change                 Written Keys        │
//! │  ───────               ────────────                 ────────────        │
//! │                                                                         │
//! │  record_scan ────────► EntryStore::record_scan ──► entries, entryIdSeq │
//! │  add_manual ─────────► EntryStore::add_manual ───► entries, entryIdSeq │
//! │  clear ──────────────► EntryStore::clear ────────► entries, entryIdSeq │
//! │  finalize ───────────► BatchStore::finalize ─────► batches, entries,   │
//! │                                                     entryIdSeq (one tx) │
//! │                        (header from batchDate,                          │
//! │                         batchStore, batchDiscount)                      │
//! │  delete_batch ───────► BatchStore::remove ───────► batches             │
//! │                                                                         │
//! │  Declined, blank or failed operations write nothing.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::{Batch, BatchStore, Confirm, CoreResult, Entry, EntryStore, Money, ScanOutcome};
use tally_db::{DbResult, StorageRepository};
use tracing::{debug, info};

use crate::error::CliResult;

#[derive(Debug)]
pub struct Session {
    storage: StorageRepository,
    entries: EntryStore,
    batches: BatchStore,
}

impl Session {
    /// Loads both stores from storage.
    ///
    /// Corrupt stored values fail here rather than being replaced.
    pub async fn load(storage: StorageRepository) -> DbResult<Self> {
        let entries = storage.load_entries().await?;
        let next_id = storage.load_entry_seq().await?;
        let batches = storage.load_batches().await?;

        let session = Session {
            entries: EntryStore::from_parts(entries, next_id),
            batches: BatchStore::from(batches),
            storage,
        };

        debug!(
            entries = session.entries.len(),
            batches = session.batches.len(),
            next_id = session.entries.next_id(),
            "Session loaded"
        );
        Ok(session)
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn batches(&self) -> &BatchStore {
        &self.batches
    }

    pub fn storage(&self) -> &StorageRepository {
        &self.storage
    }

    /// Batch at a 0-based position.
    pub fn batch(&self, index: usize) -> CoreResult<&Batch> {
        self.batches.get(index)
    }

    // =========================================================================
    // Entry List
    // =========================================================================

    pub async fn record_scan(&mut self, code: &str) -> DbResult<ScanOutcome> {
        let outcome = self.entries.record_scan(code);
        self.persist_entries().await?;

        debug!(barcode = %code, id = outcome.id(), "Scan recorded");
        Ok(outcome)
    }

    /// Manual add; `None` when the barcode is blank (nothing is written).
    pub async fn add_manual(
        &mut self,
        barcode: &str,
        quantity: Option<i64>,
        price: Option<Money>,
    ) -> DbResult<Option<Entry>> {
        let Some(entry) = self.entries.add_manual(barcode, quantity, price).cloned() else {
            return Ok(None);
        };
        self.persist_entries().await?;

        debug!(barcode = %entry.barcode, id = entry.id, "Manual entry added");
        Ok(Some(entry))
    }

    /// Returns `true` if the list was cleared.
    pub async fn clear(&mut self, confirm: &mut dyn Confirm) -> DbResult<bool> {
        if !self.entries.clear(confirm) {
            return Ok(false);
        }
        self.persist_entries().await?;

        info!("Entry list cleared");
        Ok(true)
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Finalizes the current list under the stored header.
    ///
    /// The header is read at this moment, so edits made with `tally header`
    /// since the session loaded are honored. If the write fails both stores
    /// are put back as they were.
    pub async fn finalize(&mut self) -> CliResult<Batch> {
        let header = self.storage.load_header().await?;
        let before = (self.entries.clone(), self.batches.clone());
        let batch = self.batches.finalize(header, &mut self.entries)?.clone();

        if let Err(e) = self
            .storage
            .save_finalized(self.batches.list(), self.entries.list(), self.entries.next_id())
            .await
        {
            (self.entries, self.batches) = before;
            return Err(e.into());
        }

        info!(
            ordinal = self.batches.len(),
            entries = batch.entries.len(),
            total_quantity = batch.total_quantity(),
            "Batch finalized"
        );
        Ok(batch)
    }

    /// Removes the batch at a 0-based position after confirmation.
    ///
    /// `Ok(None)` when declined.
    pub async fn delete_batch(
        &mut self,
        index: usize,
        confirm: &mut dyn Confirm,
    ) -> CliResult<Option<Batch>> {
        let Some(removed) = self.batches.remove(index, confirm)? else {
            return Ok(None);
        };
        self.storage.save_batches(self.batches.list()).await?;

        info!(ordinal = index + 1, remaining = self.batches.len(), "Batch deleted");
        Ok(Some(removed))
    }

    async fn persist_entries(&self) -> DbResult<()> {
        self.storage
            .save_entry_list(self.entries.list(), self.entries.next_id())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{BatchHeader, FixedAnswer};
    use tally_db::{Database, DbConfig};

    use crate::error::ErrorCode;

    async fn session() -> (Database, Session) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = Session::load(db.storage()).await.unwrap();
        (db, session)
    }

    #[tokio::test]
    async fn test_scans_persist_and_reload() {
        let (db, mut s) = session().await;

        s.record_scan("A1").await.unwrap();
        s.record_scan("A1").await.unwrap();
        s.record_scan("B2").await.unwrap();

        let reloaded = Session::load(db.storage()).await.unwrap();
        let list = reloaded.entries().list();
        assert_eq!(list.len(), 2);
        assert_eq!((list[0].barcode.as_str(), list[0].quantity), ("A1", 2));
        assert_eq!((list[1].barcode.as_str(), list[1].quantity), ("B2", 1));
        assert_eq!(reloaded.entries().next_id(), 3);
    }

    #[tokio::test]
    async fn test_blank_manual_add_writes_nothing() {
        let (db, mut s) = session().await;

        let added = s.add_manual("  ", Some(5), Some(Money::from_cents(250))).await.unwrap();
        assert!(added.is_none());
        assert_eq!(db.storage().get_item("entries").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ids_survive_clear_and_reload() {
        let (db, mut s) = session().await;

        s.record_scan("A1").await.unwrap();
        s.record_scan("B2").await.unwrap();
        assert!(s.clear(&mut FixedAnswer(true)).await.unwrap());

        let mut reloaded = Session::load(db.storage()).await.unwrap();
        assert!(reloaded.entries().is_empty());

        let outcome = reloaded.record_scan("C3").await.unwrap();
        assert_eq!(outcome.id(), 3);
    }

    #[tokio::test]
    async fn test_declined_clear_keeps_entries() {
        let (db, mut s) = session().await;
        s.record_scan("A1").await.unwrap();

        assert!(!s.clear(&mut FixedAnswer(false)).await.unwrap());

        let reloaded = Session::load(db.storage()).await.unwrap();
        assert_eq!(reloaded.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_uses_stored_header() {
        let (db, mut s) = session().await;
        db.storage()
            .save_header(&BatchHeader::new("2024-01-01", "X", "10"))
            .await
            .unwrap();
        s.record_scan("A1").await.unwrap();
        s.record_scan("A1").await.unwrap();

        let batch = s.finalize().await.unwrap();
        assert_eq!(batch.header, BatchHeader::new("2024-01-01", "X", "10"));
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].quantity, 2);
        assert!(s.entries().is_empty());

        let reloaded = Session::load(db.storage()).await.unwrap();
        assert!(reloaded.entries().is_empty());
        assert_eq!(reloaded.batches().list(), &[batch]);
    }

    #[tokio::test]
    async fn test_failed_finalize_changes_nothing() {
        let (db, mut s) = session().await;
        s.record_scan("A1").await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_entries BEFORE UPDATE ON local_storage \
             WHEN NEW.key = 'entries' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        assert!(s.finalize().await.is_err());
        assert_eq!(s.entries().len(), 1);
        assert!(s.batches().is_empty());

        let reloaded = Session::load(db.storage()).await.unwrap();
        assert_eq!(reloaded.entries().len(), 1);
        assert!(reloaded.batches().is_empty());
    }

    #[tokio::test]
    async fn test_finalize_empty_is_nothing_to_save() {
        let (db, mut s) = session().await;

        let err = s.finalize().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToSave);
        assert_eq!(db.storage().get_item("batches").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let (db, mut s) = session().await;
        for code in ["A1", "B2"] {
            s.record_scan(code).await.unwrap();
            s.finalize().await.unwrap();
        }

        assert!(s.delete_batch(0, &mut FixedAnswer(false)).await.unwrap().is_none());
        assert_eq!(s.batches().len(), 2);

        let removed = s.delete_batch(0, &mut FixedAnswer(true)).await.unwrap().unwrap();
        assert_eq!(removed.entries[0].barcode, "A1");

        let reloaded = Session::load(db.storage()).await.unwrap();
        assert_eq!(reloaded.batches().len(), 1);
        assert_eq!(reloaded.batches().list()[0].entries[0].barcode, "B2");

        let err = s.delete_batch(5, &mut FixedAnswer(true)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_corrupt_entries_fail_load() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.storage().set_item("entries", "not json").await.unwrap();

        assert!(Session::load(db.storage()).await.is_err());
    }
}
