//! # Database Handle
//!
//! Opens the SQLite file that backs local storage and hands out the
//! storage repository.
//!
//! ```text
//! DbConfig::new(path)          DbConfig::in_memory()
//!        │                              │
//!        ▼                              ▼
//!  file, created if missing      one private connection,
//!  WAL journal, NORMAL sync      kept open for the pool's life
//!        │                              │
//!        └──────────────┬───────────────┘
//!                       ▼
//!          Database::new ──► migrations ──► db.storage()
//! ```
//!
//! Only one process writes at a time and it writes whole values, so the pool
//! is small: a file database gets two connections, a memory database one
//! (every extra connection would see its own empty database).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::storage::StorageRepository;

const FILE_POOL_SIZE: u32 = 2;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    File(PathBuf),
    Memory,
}

/// How to open the database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: StorageLocation,
    pub pool_size: u32,
    pub acquire_timeout: Duration,
    /// Apply pending migrations on open.
    pub migrate: bool,
}

impl DbConfig {
    /// A file database; the file is created on first open, its directory
    /// must already exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: StorageLocation::File(path.into()),
            pool_size: FILE_POOL_SIZE,
            acquire_timeout: ACQUIRE_TIMEOUT,
            migrate: true,
        }
    }

    /// A throwaway database that lives as long as the pool (tests).
    pub fn in_memory() -> Self {
        DbConfig {
            location: StorageLocation::Memory,
            pool_size: 1,
            acquire_timeout: ACQUIRE_TIMEOUT,
            migrate: true,
        }
    }

    /// Ignored for memory databases.
    pub fn pool_size(mut self, size: u32) -> Self {
        if self.location != StorageLocation::Memory {
            self.pool_size = size.max(1);
        }
        self
    }

    pub fn skip_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    /// File path, if this is a file database.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StorageLocation::File(path) => Some(path),
            StorageLocation::Memory => None,
        }
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.location {
            StorageLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            StorageLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
        };
        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Open database; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and, unless disabled, migrates it.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(location = ?config.location, "Opening database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout);

        if config.location == StorageLocation::Memory {
            // Dropping the last connection drops the data with it.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(pool_size = config.pool_size, "Database pool ready");

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Safe to repeat.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        debug!("Migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The key/value storage repository.
    pub fn storage(&self) -> StorageRepository {
        StorageRepository::new(self.pool.clone())
    }

    /// Closes every connection; later queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database closed");
    }

    /// True if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
