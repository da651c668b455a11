//! Database connections, isolation levels and transactional units of work

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::OptionResult;

/// Connect to a SQLite database file, creating it if missing
pub async fn connect(db_path: &Path, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {}", db_path.display()))?;

    log::debug!("Connected to SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Connect to a private in-memory database
///
/// The pool pins a single connection so the database lives exactly as long
/// as the pool. Every call yields an independent database.
pub async fn connect_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .context("Invalid in-memory database URL")?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("Failed to connect to in-memory database")?;

    log::debug!("Connected to in-memory SQLite database");
    Ok(pool)
}

/// Run all pending embedded migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    log::debug!("Running database migrations");

    let migration_manager = crate::migrations::MigrationManager::new(pool);
    migration_manager.migrate_up().await?;

    Ok(())
}

/// Get database info for debugging
pub async fn database_info(pool: &SqlitePool) -> Result<DatabaseInfo> {
    let sqlite_version: String = sqlx::query_scalar("SELECT sqlite_version()")
        .fetch_one(pool)
        .await
        .context("Failed to get SQLite version")?;

    let schema_version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let table_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_one(pool)
    .await
    .context("Failed to get table count")?;

    let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
        .fetch_one(pool)
        .await
        .context("Failed to get page size")?;

    let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(pool)
        .await
        .context("Failed to get journal mode")?;

    Ok(DatabaseInfo {
        sqlite_version,
        schema_version,
        table_count,
        page_size,
        journal_mode,
    })
}

#[derive(Debug)]
pub struct DatabaseInfo {
    pub sqlite_version: String,
    pub schema_version: i64,
    pub table_count: i64,
    pub page_size: i64,
    pub journal_mode: String,
}

/// SQLite transaction modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Locks are taken lazily on first read/write (engine default)
    #[default]
    Deferred,
    /// Write lock is taken when the transaction begins
    Immediate,
    /// Readers and writers are excluded for the whole transaction
    Exclusive,
}

impl IsolationLevel {
    pub fn begin_statement(self) -> &'static str {
        match self {
            IsolationLevel::Deferred => "BEGIN DEFERRED",
            IsolationLevel::Immediate => "BEGIN IMMEDIATE",
            IsolationLevel::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::Deferred => "deferred",
            IsolationLevel::Immediate => "immediate",
            IsolationLevel::Exclusive => "exclusive",
        };
        f.write_str(name)
    }
}

impl FromStr for IsolationLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deferred" => Ok(IsolationLevel::Deferred),
            "immediate" => Ok(IsolationLevel::Immediate),
            "exclusive" => Ok(IsolationLevel::Exclusive),
            other => anyhow::bail!(
                "Unknown isolation level '{}'. Valid values: deferred, immediate, exclusive",
                other
            ),
        }
    }
}

/// A named database handle that options bind to
#[derive(Debug, Clone)]
pub struct Database {
    name: Arc<str>,
    pool: SqlitePool,
    default_isolation: IsolationLevel,
}

impl Database {
    pub fn new(name: impl Into<Arc<str>>, pool: SqlitePool) -> Self {
        Self {
            name: name.into(),
            pool,
            default_isolation: IsolationLevel::default(),
        }
    }

    /// Isolation used when an option does not request one
    pub fn with_default_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.default_isolation = isolation;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn default_isolation(&self) -> IsolationLevel {
        self.default_isolation
    }

    /// Start a unit of work, falling back to the handle's default isolation
    pub async fn begin(&self, isolation: Option<IsolationLevel>) -> OptionResult<UnitOfWork> {
        let isolation = isolation.unwrap_or(self.default_isolation);
        let tx = match isolation {
            IsolationLevel::Deferred => self.pool.begin().await?,
            other => self.pool.begin_with(other.begin_statement()).await?,
        };

        Ok(UnitOfWork {
            tx,
            database: self.name.clone(),
            isolation,
        })
    }

    /// Close every pooled connection; later units of work fail
    pub async fn close(&self) {
        self.pool.close().await;
        log::debug!("Closed database '{}'", self.name);
    }
}

/// A scoped transaction against one database
///
/// Dropping an unfinished unit rolls it back.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    database: Arc<str>,
    isolation: IsolationLevel,
}

impl UnitOfWork {
    /// Connection to run statements on inside this unit
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub async fn commit(self) -> OptionResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> OptionResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err`, and hand the result back
    pub async fn finish<R>(self, result: OptionResult<R>) -> OptionResult<R> {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                log::debug!("Rolling back unit of work on '{}': {}", self.database, err);
                if let Err(rollback_err) = self.tx.rollback().await {
                    log::warn!(
                        "Rollback failed on '{}': {}",
                        self.database,
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}
