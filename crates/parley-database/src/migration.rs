//! Schema migrations for users, friendships, and direct messages.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use parley_core::error::{AppError, ErrorKind};

/// Migrations embedded from the workspace `migrations/` directory.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Version of the newest embedded migration.
pub fn latest_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Brings the schema up to [`latest_version`].
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!(
        embedded = MIGRATOR.iter().count(),
        target_version = ?latest_version(),
        "Applying schema migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Schema migration failed: {e}"),
            e,
        )
    })?;

    info!(version = ?latest_version(), "Schema is current");
    Ok(())
}
