//! # tally-db
//!
//! Key/value storage for an intake session, kept in one SQLite table.
//!
//! ```text
//!   Session ──► StorageRepository ──► local_storage(key, value, updated_at)
//!                     │
//!                     ├─ entries      JSON array of Entry
//!                     ├─ entryIdSeq   next entry id
//!                     ├─ batches      JSON array of Batch
//!                     ├─ scanMode     1d | 2d | all
//!                     └─ batchDate / batchStore / batchDiscount
//! ```
//!
//! Each save replaces the whole value under its key. Open with
//! [`Database::new`]; the schema is migrated on open.
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let entries = db.storage().load_entries().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, StorageLocation};
pub use repository::storage::{keys, StorageRepository};
