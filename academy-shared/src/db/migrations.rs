/// Schema migrations
///
/// Migrations live in `academy-shared/migrations/` and are embedded into the
/// binary at compile time, so the server can bring a fresh database up to
/// date on startup without shipping SQL files alongside it.

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Migration state of a database
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MigrationStatus {
    /// Applied successfully
    pub applied_migrations: usize,

    /// Embedded in this build
    pub known_migrations: usize,

    /// Latest applied version
    pub latest_version: Option<i64>,

    pub is_up_to_date: bool,
}

/// Number of migrations embedded in this build
pub fn known_migrations() -> usize {
    MIGRATOR.iter().count()
}

/// Applies all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(known = known_migrations(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database migrations complete");
    Ok(())
}

/// Reads `_sqlx_migrations` and compares it with the embedded set
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    let known = known_migrations();

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            known_migrations: known,
            latest_version: None,
            is_up_to_date: known == 0,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    let applied = usize::try_from(count).unwrap_or_default();

    Ok(MigrationStatus {
        applied_migrations: applied,
        known_migrations: known,
        latest_version,
        is_up_to_date: applied >= known,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations() {
        assert_eq!(known_migrations(), 5);

        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
    }
}
