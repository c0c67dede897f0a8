//! Schema migrations, embedded at compile time from `migrations/sqlite/`.
//!
//! Files are applied in name order (`NNN_name.sql`) and recorded in
//! `_sqlx_migrations`. An applied file must never change; add a new one.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever has not been applied yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = applied_count(pool).await?;
    MIGRATOR.run(pool).await?;
    let after = applied_count(pool).await?;

    if after > before {
        info!(applied = after - before, "Storage schema upgraded");
    } else {
        debug!(version = after, "Storage schema up to date");
    }
    Ok(())
}

/// Number of embedded migrations not yet applied.
pub async fn pending_migrations(pool: &SqlitePool) -> DbResult<usize> {
    let applied = applied_count(pool).await?;
    Ok(MIGRATOR.migrations.len().saturating_sub(applied))
}

async fn applied_count(pool: &SqlitePool) -> DbResult<usize> {
    let table: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;

    if table.is_none() {
        return Ok(0);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;
    Ok(usize::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_open_applies_everything() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(pending_migrations(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_skipped_migrations_stay_pending() {
        let db = Database::new(DbConfig::in_memory().skip_migrations())
            .await
            .unwrap();
        assert!(pending_migrations(db.pool()).await.unwrap() >= 1);

        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
        assert_eq!(pending_migrations(db.pool()).await.unwrap(), 0);
    }
}
