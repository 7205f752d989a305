//! Schema for the `documents` table, embedded from `migrations/` at build time.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::SqlitePool;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Bring the document schema up to date. Safe to call on every start.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    info!(version = ?latest_version(), "document schema ready");
    Ok(())
}

/// Newest schema version compiled into this build.
pub fn latest_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Newest schema version recorded as applied in `pool`; `None` before the
/// first migration.
pub async fn applied_version(pool: &SqlitePool) -> Result<Option<i64>, sqlx::Error> {
    let (version,): (Option<i64>,) =
        sqlx::query_as("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
    Ok(version)
}
