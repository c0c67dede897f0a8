//! # Storage Repository
//!
//! Whole-value key/value storage, one row per key.
//!
//! ## Persisted Keys
//! ```text
//! ┌────────────────┬──────────────────────────┬──────────────────────────┐
//! │ key            │ value                    │ missing means            │
//! ├────────────────┼──────────────────────────┼──────────────────────────┤
//! │ entries        │ JSON array of Entry      │ []                       │
//! │ batches        │ JSON array of Batch      │ []                       │
//! │ scanMode       │ 1d | 2d | all            │ all                      │
//! │ batchDate      │ plain text               │ ""                       │
//! │ batchStore     │ plain text               │ ""                       │
//! │ batchDiscount  │ plain text               │ "0"                      │
//! │ entryIdSeq     │ integer text             │ derived from entries     │
//! └────────────────┴──────────────────────────┴──────────────────────────┘
//! ```
//!
//! Every save rewrites the whole value for its key: last full-state write
//! wins. Values that fail to decode surface as [`DbError::Corrupt`] at load.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use tally_core::{Batch, BatchHeader, Entry, EntryId, ScanMode, DEFAULT_DISCOUNT};

use crate::error::{DbError, DbResult};

/// Storage key names.
pub mod keys {
    pub const ENTRIES: &str = "entries";
    pub const BATCHES: &str = "batches";
    pub const SCAN_MODE: &str = "scanMode";
    pub const BATCH_DATE: &str = "batchDate";
    pub const BATCH_STORE: &str = "batchStore";
    pub const BATCH_DISCOUNT: &str = "batchDiscount";
    pub const ENTRY_ID_SEQ: &str = "entryIdSeq";
}

/// Repository for the `local_storage` table.
#[derive(Debug, Clone)]
pub struct StorageRepository {
    pool: SqlitePool,
}

impl StorageRepository {
    /// Creates a new StorageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StorageRepository { pool }
    }

    // =========================================================================
    // Raw Values
    // =========================================================================

    /// Reads the raw value stored under `key`.
    pub async fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_storage WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Replaces the value stored under `key`.
    pub async fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing storage key");

        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes `key`. Missing keys are fine.
    pub async fn remove_item(&self, key: &str) -> DbResult<()> {
        debug!(key = %key, "Removing storage key");

        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> DbResult<T> {
        match self.get_item(key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| DbError::corrupt(key, e)),
            None => Ok(T::default()),
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw).await
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Loads the current entry list (empty if never saved).
    pub async fn load_entries(&self) -> DbResult<Vec<Entry>> {
        self.load_json(keys::ENTRIES).await
    }

    /// Loads the stored next-id counter, if any.
    pub async fn load_entry_seq(&self) -> DbResult<Option<EntryId>> {
        match self.get_item(keys::ENTRY_ID_SEQ).await? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| DbError::corrupt(keys::ENTRY_ID_SEQ, e)),
            None => Ok(None),
        }
    }

    /// Writes the entry list and the id counter together.
    ///
    /// Both rows land in one transaction so a reload never sees entries
    /// whose ids are ahead of the counter.
    pub async fn save_entry_list(&self, entries: &[Entry], next_id: EntryId) -> DbResult<()> {
        let raw = serde_json::to_string(entries)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        upsert(&mut tx, keys::ENTRIES, &raw).await?;
        upsert(&mut tx, keys::ENTRY_ID_SEQ, &next_id.to_string()).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(entries = entries.len(), next_id, "Entry list saved");
        Ok(())
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Loads the finalized batches (empty if never saved).
    pub async fn load_batches(&self) -> DbResult<Vec<Batch>> {
        self.load_json(keys::BATCHES).await
    }

    pub async fn save_batches(&self, batches: &[Batch]) -> DbResult<()> {
        self.save_json(keys::BATCHES, batches).await
    }

    /// Writes the batch list, the emptied entry list and the counter of a
    /// finalize in one transaction. On failure none of the three change.
    pub async fn save_finalized(
        &self,
        batches: &[Batch],
        entries: &[Entry],
        next_id: EntryId,
    ) -> DbResult<()> {
        let batches_raw = serde_json::to_string(batches)?;
        let entries_raw = serde_json::to_string(entries)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        upsert(&mut tx, keys::BATCHES, &batches_raw).await?;
        upsert(&mut tx, keys::ENTRIES, &entries_raw).await?;
        upsert(&mut tx, keys::ENTRY_ID_SEQ, &next_id.to_string()).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(batches = batches.len(), next_id, "Finalized batch saved");
        Ok(())
    }

    // =========================================================================
    // Scan Mode
    // =========================================================================

    /// Loads the scan mode (`all` if never saved).
    pub async fn load_scan_mode(&self) -> DbResult<ScanMode> {
        match self.get_item(keys::SCAN_MODE).await? {
            Some(raw) if !raw.is_empty() => raw
                .parse()
                .map_err(|e| DbError::corrupt(keys::SCAN_MODE, e)),
            _ => Ok(ScanMode::default()),
        }
    }

    pub async fn save_scan_mode(&self, mode: ScanMode) -> DbResult<()> {
        self.set_item(keys::SCAN_MODE, mode.as_str()).await
    }

    // =========================================================================
    // Batch Header
    // =========================================================================

    /// Loads the header fields a finalize would use right now.
    ///
    /// Missing or empty values fall back to `""`, `""` and `"0"`.
    pub async fn load_header(&self) -> DbResult<BatchHeader> {
        let date = self.get_item(keys::BATCH_DATE).await?.unwrap_or_default();
        let store = self.get_item(keys::BATCH_STORE).await?.unwrap_or_default();
        let discount = self
            .get_item(keys::BATCH_DISCOUNT)
            .await?
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DISCOUNT.to_string());

        Ok(BatchHeader::new(date, store, discount))
    }

    pub async fn save_header(&self, header: &BatchHeader) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        upsert(&mut tx, keys::BATCH_DATE, &header.date).await?;
        upsert(&mut tx, keys::BATCH_STORE, &header.store).await?;
        upsert(&mut tx, keys::BATCH_DISCOUNT, &header.discount).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO local_storage (key, value, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

async fn upsert(tx: &mut Transaction<'_, Sqlite>, key: &str, value: &str) -> DbResult<()> {
    sqlx::query(UPSERT_SQL)
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{BatchStore, EntryStore, FixedAnswer, Money};

    async fn storage() -> StorageRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().storage()
    }

    #[tokio::test]
    async fn test_raw_items() {
        let repo = storage().await;
        assert_eq!(repo.get_item("batchStore").await.unwrap(), None);

        repo.set_item("batchStore", "Downtown").await.unwrap();
        repo.set_item("batchStore", "Uptown").await.unwrap();
        assert_eq!(
            repo.get_item("batchStore").await.unwrap().as_deref(),
            Some("Uptown")
        );

        repo.remove_item("batchStore").await.unwrap();
        repo.remove_item("batchStore").await.unwrap();
        assert_eq!(repo.get_item("batchStore").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let repo = storage().await;
        assert!(repo.load_entries().await.unwrap().is_empty());
        assert!(repo.load_batches().await.unwrap().is_empty());
        assert_eq!(repo.load_scan_mode().await.unwrap(), ScanMode::All);
        assert_eq!(repo.load_entry_seq().await.unwrap(), None);
        assert_eq!(repo.load_header().await.unwrap(), BatchHeader::default());
    }

    #[tokio::test]
    async fn test_entries_round_trip() {
        let repo = storage().await;
        let mut store = EntryStore::new();
        store.record_scan("A1");
        store.record_scan("A1");
        store.add_manual("B2", Some(3), Some(Money::from_cents(250)));

        repo.save_entry_list(store.list(), store.next_id())
            .await
            .unwrap();

        let loaded = repo.load_entries().await.unwrap();
        assert_eq!(loaded, store.list());
        assert_eq!(repo.load_entry_seq().await.unwrap(), Some(3));
        assert_eq!(
            repo.get_item(keys::ENTRIES).await.unwrap().unwrap(),
            r#"[{"id":1,"barcode":"A1","quantity":2,"price":0},{"id":2,"barcode":"B2","quantity":3,"price":2.5}]"#
        );
    }

    #[tokio::test]
    async fn test_batches_round_trip() {
        let repo = storage().await;
        let mut entries = EntryStore::new();
        let mut batches = BatchStore::new();

        entries.record_scan("A1");
        batches
            .finalize(BatchHeader::new("2024-01-01", "X", "10"), &mut entries)
            .unwrap();
        entries.record_scan("B2");
        batches
            .finalize(BatchHeader::default(), &mut entries)
            .unwrap();
        batches.remove(1, &mut FixedAnswer(true)).unwrap();

        repo.save_batches(batches.list()).await.unwrap();
        assert_eq!(repo.load_batches().await.unwrap(), batches.list());
    }

    /// Makes every write to `key` fail.
    async fn reject_writes(db: &Database, key: &str) {
        for event in ["INSERT", "UPDATE"] {
            let sql = format!(
                "CREATE TRIGGER reject_{event} BEFORE {event} ON local_storage \
                 WHEN NEW.key = '{key}' BEGIN SELECT RAISE(ABORT, 'rejected'); END"
            );
            sqlx::query(&sql).execute(db.pool()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_finalize_writes_together() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.storage();
        let mut entries = EntryStore::new();
        let mut batches = BatchStore::new();

        entries.record_scan("A1");
        repo.save_entry_list(entries.list(), entries.next_id()).await.unwrap();
        batches.finalize(BatchHeader::default(), &mut entries).unwrap();

        reject_writes(&db, keys::ENTRIES).await;
        assert!(repo
            .save_finalized(batches.list(), entries.list(), entries.next_id())
            .await
            .is_err());

        // Nothing moved: the entry is still current and no batch exists.
        assert_eq!(repo.load_entries().await.unwrap().len(), 1);
        assert!(repo.load_batches().await.unwrap().is_empty());
        assert_eq!(repo.get_item(keys::BATCHES).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_finalize_saved() {
        let repo = storage().await;
        let mut entries = EntryStore::new();
        let mut batches = BatchStore::new();
        entries.record_scan("A1");
        batches.finalize(BatchHeader::default(), &mut entries).unwrap();

        repo.save_finalized(batches.list(), entries.list(), entries.next_id())
            .await
            .unwrap();

        assert!(repo.load_entries().await.unwrap().is_empty());
        assert_eq!(repo.load_batches().await.unwrap(), batches.list());
        assert_eq!(repo.load_entry_seq().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_scan_mode() {
        let repo = storage().await;
        repo.save_scan_mode(ScanMode::Linear).await.unwrap();
        assert_eq!(repo.get_item(keys::SCAN_MODE).await.unwrap().unwrap(), "1d");
        assert_eq!(repo.load_scan_mode().await.unwrap(), ScanMode::Linear);

        repo.set_item(keys::SCAN_MODE, "3d").await.unwrap();
        assert!(matches!(
            repo.load_scan_mode().await,
            Err(DbError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_header() {
        let repo = storage().await;
        let header = BatchHeader::new("2024-01-01", "X", "10");
        repo.save_header(&header).await.unwrap();
        assert_eq!(repo.load_header().await.unwrap(), header);

        repo.set_item(keys::BATCH_DISCOUNT, "").await.unwrap();
        assert_eq!(repo.load_header().await.unwrap().discount, "0");
    }

    #[tokio::test]
    async fn test_corrupt_entries() {
        let repo = storage().await;
        repo.set_item(keys::ENTRIES, "not json").await.unwrap();
        assert!(matches!(
            repo.load_entries().await,
            Err(DbError::Corrupt { ref key, .. }) if key == "entries"
        ));

        repo.set_item(keys::ENTRY_ID_SEQ, "seven").await.unwrap();
        assert!(repo.load_entry_seq().await.is_err());
    }

    #[tokio::test]
    async fn test_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            let mut store = EntryStore::new();
            store.record_scan("A1");
            db.storage()
                .save_entry_list(store.list(), store.next_id())
                .await
                .unwrap();
            db.close().await;
        }

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let repo = db.storage();
        let store = EntryStore::from_parts(
            repo.load_entries().await.unwrap(),
            repo.load_entry_seq().await.unwrap(),
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].barcode, "A1");
        assert_eq!(store.next_id(), 2);
    }
}
