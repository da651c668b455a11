//! Versioned schema migrations for the options table
//!
//! The migration files are static data embedded at compile time. Applications
//! with their own migration runner can read them through [`load_migrations`];
//! [`MigrationManager`] is provided for those that do not.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

pub mod manager;

pub use manager::{MigrationManager, MigrationStatus};

/// Represents a single migration with up and down SQL
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    pub down_sql: String,
}

impl Migration {
    /// Individual statements of the SQL for one direction, in order
    pub fn statements(&self, direction: Direction) -> Vec<&str> {
        let sql = match direction {
            Direction::Up => &self.up_sql,
            Direction::Down => &self.down_sql,
        };
        sql.split(';')
            .map(str::trim)
            .filter(|stmt| !stmt.is_empty())
            .collect()
    }
}

/// Migration status in the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::NaiveDateTime,
    pub checksum: String,
}

/// Direction for migration operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Load all available migrations from the embedded files
/// Migrations are auto-discovered from files/ directory using include_dir!
pub fn load_migrations() -> Result<BTreeMap<i64, Migration>> {
    use include_dir::{Dir, include_dir};

    static MIGRATIONS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/migrations/files");

    let mut migrations = BTreeMap::new();

    // Each migration lives in a directory named NNN_name
    for entry in MIGRATIONS_DIR.dirs() {
        let dir_name = entry
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .context("Invalid migration directory name")?;

        let Some((version, name)) = dir_name.split_once('_') else {
            anyhow::bail!(
                "Invalid migration directory format: {}. Expected format: NNN_name",
                dir_name
            );
        };

        let version: i64 = version
            .parse()
            .with_context(|| format!("Invalid migration version in directory: {}", dir_name))?;

        let read = |file: &str| -> Result<String> {
            let path = format!("{}/{}", dir_name, file);
            let contents = MIGRATIONS_DIR
                .get_file(&path)
                .with_context(|| format!("Missing {} in migration {}", file, dir_name))?
                .contents_utf8()
                .with_context(|| format!("{} is not valid UTF-8 in migration {}", file, dir_name))?;
            Ok(contents.to_string())
        };

        migrations.insert(
            version,
            Migration {
                version,
                name: name.to_string(),
                up_sql: read("up.sql")?,
                down_sql: read("down.sql")?,
            },
        );
    }

    if migrations.is_empty() {
        anyhow::bail!("No migrations found in files directory");
    }

    Ok(migrations)
}

/// Initialize the migration tracking table
pub async fn init_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            checksum TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create schema_migrations table")?;

    Ok(())
}

/// Get list of applied migrations
pub async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<AppliedMigration>> {
    let migrations = sqlx::query_as::<_, AppliedMigration>(
        "SELECT version, name, applied_at, checksum FROM schema_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .context("Failed to get applied migrations")?;

    Ok(migrations)
}

/// Calculate checksum for migration SQL
/// Normalizes line endings to LF before hashing so checkouts on any platform agree
pub fn calculate_checksum(sql: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let normalized = sql.replace("\r\n", "\n").replace('\r', "\n");

    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Validate that applied migrations match available ones
pub async fn validate_migrations(pool: &SqlitePool) -> Result<()> {
    let available = load_migrations()?;
    let applied = get_applied_migrations(pool).await?;

    for applied_migration in applied {
        let Some(available_migration) = available.get(&applied_migration.version) else {
            anyhow::bail!(
                "Applied migration {} '{}' not found in available migrations",
                applied_migration.version,
                applied_migration.name
            );
        };

        let expected_checksum = calculate_checksum(&available_migration.up_sql);
        if applied_migration.checksum != expected_checksum {
            anyhow::bail!(
                "Migration {} checksum mismatch! Applied: {}, Expected: {}. \
                This indicates the migration file has been modified after being applied.",
                applied_migration.version,
                applied_migration.checksum,
                expected_checksum
            );
        }
    }

    Ok(())
}

/// Get pending migrations (available but not applied)
pub async fn get_pending_migrations(pool: &SqlitePool) -> Result<Vec<Migration>> {
    let available = load_migrations()?;
    let applied = get_applied_migrations(pool).await?;

    let applied_versions: std::collections::HashSet<i64> =
        applied.into_iter().map(|m| m.version).collect();

    Ok(available
        .into_values()
        .filter(|migration| !applied_versions.contains(&migration.version))
        .collect())
}

/// Get the current schema version (highest applied migration)
pub async fn get_current_version(pool: &SqlitePool) -> Result<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to get current schema version")?;

    Ok(version.filter(|v| *v > 0))
}

/// Collation the `value` column should carry at a schema version
///
/// `None` before migration 001 has been applied.
pub fn expected_value_collation(version: Option<i64>) -> Option<&'static str> {
    match version {
        None => None,
        Some(1) => Some("NOCASE"),
        Some(_) => Some("BINARY"),
    }
}

/// Collation of the `value` column as declared in `sqlite_master`
///
/// `None` when the options table does not exist.
pub async fn value_collation(pool: &SqlitePool) -> Result<Option<String>> {
    let sql: Option<String> = sqlx::query_scalar(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'options'",
    )
    .fetch_optional(pool)
    .await
    .context("Failed to read options table definition")?;

    Ok(sql.map(|sql| parse_value_collation(&sql)))
}

// Columns without a COLLATE clause compare as BINARY
fn parse_value_collation(table_sql: &str) -> String {
    let columns = table_sql.split_once('(').map_or("", |(_, rest)| rest);

    columns
        .split(',')
        .map(|column| column.split_whitespace().collect::<Vec<_>>())
        .find(|words| {
            words
                .first()
                .is_some_and(|name| name.trim_matches('"').eq_ignore_ascii_case("value"))
        })
        .and_then(|words| {
            let at = words.iter().position(|w| w.eq_ignore_ascii_case("COLLATE"))?;
            words.get(at + 1).map(|name| {
                name.trim_matches(|c: char| c == ')' || c == ';' || c == '"')
                    .to_ascii_uppercase()
            })
        })
        .unwrap_or_else(|| "BINARY".to_string())
}
