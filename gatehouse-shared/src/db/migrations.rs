/// Database migration runner
///
/// Migrations live in the workspace-level `migrations/` directory as
/// reversible pairs (`{version}_{name}.up.sql` / `{version}_{name}.down.sql`)
/// and are embedded at compile time.
///
/// The boot sequence selects what to do through [`MigrationMode`]:
///
/// - `m` applies every pending migration
/// - `r` rolls every applied migration back
/// - `none` leaves the schema alone
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::db::migrations::{apply, MigrationMode};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
/// let mode: MigrationMode = "m".parse().unwrap();
/// apply(&pool, mode).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{migrate::Migrator, postgres::PgPool};
use std::{fmt, str::FromStr};
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// What the boot sequence should do with the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationMode {
    /// Apply pending migrations
    Migrate,

    /// Undo every applied migration
    Rollback,

    /// Do nothing
    #[default]
    None,
}

impl FromStr for MigrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "migrate" => Ok(MigrationMode::Migrate),
            "r" | "rollback" => Ok(MigrationMode::Rollback),
            "" | "none" => Ok(MigrationMode::None),
            other => Err(format!("unknown migration mode '{}' (expected m, r or none)", other)),
        }
    }
}

impl fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MigrationMode::Migrate => "migrate",
            MigrationMode::Rollback => "rollback",
            MigrationMode::None => "none",
        };
        f.write_str(label)
    }
}

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of migrations that have been applied
    pub applied_migrations: usize,

    /// Number of migrations embedded in the binary
    pub known_migrations: usize,

    /// Latest applied migration version
    pub latest_version: Option<i64>,
}

impl MigrationStatus {
    /// Whether every embedded migration has been applied
    pub fn is_up_to_date(&self) -> bool {
        self.applied_migrations >= self.known_migrations
    }
}

/// Runs the requested migration mode
pub async fn apply(pool: &PgPool, mode: MigrationMode) -> Result<(), sqlx::migrate::MigrateError> {
    match mode {
        MigrationMode::Migrate => run_migrations(pool).await,
        MigrationMode::Rollback => rollback_migrations(pool).await,
        MigrationMode::None => {
            debug!("Migration mode is none, leaving schema untouched");
            Ok(())
        }
    }
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!("Migration failed: {}", e);
        e
    })?;

    info!("All database migrations completed successfully");
    Ok(())
}

/// Undoes every applied migration, newest first
pub async fn rollback_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    warn!("Rolling back all database migrations");

    MIGRATOR.undo(pool, 0).await.map_err(|e| {
        warn!("Rollback failed: {}", e);
        e
    })?;

    info!("Database migrations rolled back");
    Ok(())
}

/// Reports how many migrations are applied against how many are embedded
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let known_migrations = MIGRATOR.iter().filter(|m| m.migration_type.is_up_migration()).count();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            known_migrations,
            latest_version: None,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: usize::try_from(count).unwrap_or_default(),
        known_migrations,
        latest_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_mode_parse() {
        assert_eq!("m".parse::<MigrationMode>(), Ok(MigrationMode::Migrate));
        assert_eq!("R".parse::<MigrationMode>(), Ok(MigrationMode::Rollback));
        assert_eq!("none".parse::<MigrationMode>(), Ok(MigrationMode::None));
        assert_eq!("".parse::<MigrationMode>(), Ok(MigrationMode::None));
        assert!("sideways".parse::<MigrationMode>().is_err());
    }

    #[test]
    fn test_migration_mode_default_is_none() {
        assert_eq!(MigrationMode::default(), MigrationMode::None);
        assert_eq!(MigrationMode::Rollback.to_string(), "rollback");
    }

    #[test]
    fn test_status_up_to_date() {
        let status = MigrationStatus {
            applied_migrations: 1,
            known_migrations: 1,
            latest_version: Some(20250101000000),
        };
        assert!(status.is_up_to_date());

        let behind = MigrationStatus {
            applied_migrations: 0,
            ..status
        };
        assert!(!behind.is_up_to_date());
    }

    #[test]
    fn test_embedded_migrations_present() {
        assert!(MIGRATOR.iter().count() >= 2);
    }
}
