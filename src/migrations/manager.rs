//! Applies the embedded options-table migrations and reports on schema state

use anyhow::{Context, Result};
use log::{debug, info, warn};
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{
    AppliedMigration, Direction, Migration, calculate_checksum, expected_value_collation,
    get_applied_migrations, get_current_version, get_pending_migrations, init_migration_table,
    load_migrations, validate_migrations, value_collation,
};

/// Runs migrations against one pool
pub struct MigrationManager<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MigrationManager<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `schema_migrations` bookkeeping table if needed
    pub async fn init(&self) -> Result<()> {
        init_migration_table(self.pool).await
    }

    /// Apply every pending migration in version order
    pub async fn migrate_up(&self) -> Result<()> {
        self.init().await?;
        validate_migrations(self.pool).await?;

        let pending = get_pending_migrations(self.pool).await?;
        if pending.is_empty() {
            debug!("Options schema already up to date");
            return Ok(());
        }

        for migration in &pending {
            self.apply(migration, Direction::Up).await?;
        }
        info!("Applied {} options schema migration(s)", pending.len());
        Ok(())
    }

    /// Undo applied migrations above `target` (every one when `None`), newest first
    pub async fn migrate_down(&self, target: Option<i64>) -> Result<()> {
        self.init().await?;
        validate_migrations(self.pool).await?;

        let target = target.unwrap_or(0);
        let available = load_migrations()?;
        let steps = get_applied_migrations(self.pool)
            .await?
            .into_iter()
            .rev()
            .filter(|applied| applied.version > target)
            .map(|applied| {
                available.get(&applied.version).cloned().with_context(|| {
                    format!("No embedded files for applied migration {}", applied.version)
                })
            })
            .collect::<Result<Vec<Migration>>>()?;

        if steps.is_empty() {
            debug!("Options schema already at or below version {}", target);
            return Ok(());
        }

        for migration in &steps {
            self.apply(migration, Direction::Down).await?;
        }
        info!("Options schema rolled back to version {}", target);
        Ok(())
    }

    /// Run one migration's statements and its bookkeeping in a single transaction
    async fn apply(&self, migration: &Migration, direction: Direction) -> Result<()> {
        let statements = migration.statements(direction);
        if statements.is_empty() {
            warn!(
                "Migration {} has no {:?} statements",
                migration.version, direction
            );
            return Ok(());
        }

        debug!(
            "Migration {} '{}' {:?}: {} statement(s)",
            migration.version,
            migration.name,
            direction,
            statements.len()
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open migration transaction")?;

        for (index, statement) in statements.into_iter().enumerate() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!(
                        "Migration {} {:?} failed at statement {}",
                        migration.version,
                        direction,
                        index + 1
                    )
                })?;
        }
        record(&mut tx, migration, direction).await?;

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit migration {}", migration.version))?;
        Ok(())
    }

    pub async fn status(&self) -> Result<MigrationStatus> {
        self.init().await?;

        Ok(MigrationStatus {
            current_version: get_current_version(self.pool).await?,
            total_available: load_migrations()?.len(),
            applied_migrations: get_applied_migrations(self.pool).await?,
            pending_migrations: get_pending_migrations(self.pool).await?,
        })
    }

    /// Check recorded checksums and that the `value` column carries the
    /// collation its schema version implies
    pub async fn validate(&self) -> Result<()> {
        self.init().await?;
        validate_migrations(self.pool).await?;

        let version = get_current_version(self.pool).await?;
        let Some(expected) = expected_value_collation(version) else {
            return Ok(());
        };

        match value_collation(self.pool).await? {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => anyhow::bail!(
                "options.value is COLLATE {} but schema version {} expects COLLATE {}",
                actual,
                version.unwrap_or(0),
                expected
            ),
            None => anyhow::bail!(
                "Schema version {} is recorded but the options table is missing",
                version.unwrap_or(0)
            ),
        }
    }
}

async fn record(
    tx: &mut Transaction<'_, Sqlite>,
    migration: &Migration,
    direction: Direction,
) -> Result<()> {
    match direction {
        Direction::Up => {
            sqlx::query("INSERT INTO schema_migrations (version, name, checksum) VALUES (?, ?, ?)")
                .bind(migration.version)
                .bind(&migration.name)
                .bind(calculate_checksum(&migration.up_sql))
                .execute(&mut **tx)
                .await
        }
        Direction::Down => {
            sqlx::query("DELETE FROM schema_migrations WHERE version = ?")
                .bind(migration.version)
                .execute(&mut **tx)
                .await
        }
    }
    .with_context(|| format!("Failed to record migration {}", migration.version))?;
    Ok(())
}

/// Snapshot of applied and pending migrations
#[derive(Debug)]
pub struct MigrationStatus {
    pub current_version: Option<i64>,
    pub total_available: usize,
    pub applied_migrations: Vec<AppliedMigration>,
    pub pending_migrations: Vec<Migration>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending_migrations.is_empty()
    }

    pub fn print_status(&self) {
        let version = self
            .current_version
            .map_or_else(|| "none".to_string(), |v| v.to_string());
        println!(
            "Options schema version {} ({} of {} applied)",
            version,
            self.applied_migrations.len(),
            self.total_available
        );

        for migration in &self.applied_migrations {
            println!(
                "  ✓ {:03} {}  {}",
                migration.version,
                migration.name,
                migration.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        for migration in &self.pending_migrations {
            println!("  ○ {:03} {}  pending", migration.version, migration.name);
        }
    }
}
