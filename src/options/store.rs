//! Row access for the options table and required-option tracking

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use sqlx::SqliteConnection;

use super::option::ConfigOption;
use super::value::OptionValue;
use crate::error::{OptionError, OptionResult};

/// Upper bound on key length, matching the column definition
pub const MAX_KEY_LENGTH: usize = 255;

/// One row of the options table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OptionRecord {
    pub key: String,
    pub value: Option<String>,
}

pub async fn select_by_key(
    conn: &mut SqliteConnection,
    key: &str,
) -> Result<Option<OptionRecord>, sqlx::Error> {
    sqlx::query_as::<_, OptionRecord>("SELECT key, value FROM options WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn insert(
    conn: &mut SqliteConnection,
    key: &str,
    value: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO options (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_by_key(
    conn: &mut SqliteConnection,
    key: &str,
    value: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE options SET value = ? WHERE key = ?")
        .bind(value)
        .bind(key)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Update the row if it exists, insert it otherwise
pub async fn upsert(
    conn: &mut SqliteConnection,
    key: &str,
    value: Option<&str>,
) -> Result<(), sqlx::Error> {
    if select_by_key(conn, key).await?.is_some() {
        update_by_key(conn, key, value).await
    } else {
        insert(conn, key, value).await
    }
}

/// Every row, ordered by key
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<OptionRecord>, sqlx::Error> {
    sqlx::query_as::<_, OptionRecord>("SELECT key, value FROM options ORDER BY key")
        .fetch_all(&mut *conn)
        .await
}

/// Type-erased view of a non-nullable option
#[async_trait]
pub trait RequiredOption: Send + Sync {
    fn key(&self) -> &str;

    /// Run the option's rule against storage, bypassing any cache
    async fn verify(&self) -> OptionResult<()>;
}

#[async_trait]
impl<T: OptionValue> RequiredOption for ConfigOption<T> {
    fn key(&self) -> &str {
        ConfigOption::key(self)
    }

    async fn verify(&self) -> OptionResult<()> {
        self.resolve().await.map(|_| ())
    }
}

/// Process-wide record of required options
///
/// Clones share the same list.
#[derive(Clone, Default)]
pub struct OptionsStore {
    required: Arc<RwLock<Vec<Arc<dyn RequiredOption>>>>,
}

impl OptionsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track_required<T: OptionValue>(&self, option: &ConfigOption<T>) {
        self.required
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(option.clone()));
        log::debug!("Tracking required option: {}", option.key());
    }

    /// Keys in declaration order; a key declared twice appears twice
    pub fn required_keys(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|option| option.key().to_string())
            .collect()
    }

    pub fn required_count(&self) -> usize {
        self.required
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forget every tracked option (used between tests)
    pub fn clear_required(&self) {
        self.required
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Read every required option once and report the unset ones together
    ///
    /// Only `RequiredMissing` is folded into the report; any other failure is
    /// returned as soon as it happens.
    pub async fn check_required(&self) -> OptionResult<()> {
        let mut missing = Vec::new();

        for option in self.snapshot() {
            match option.verify().await {
                Ok(()) => {}
                Err(err) if err.is_required_missing() => missing.push(option.key().to_string()),
                Err(err) => return Err(err),
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        log::warn!("Required options not set: {}", missing.join(", "));
        Err(OptionError::RequiredMissingAggregate { keys: missing })
    }

    // Cloned out so checks never run under the lock
    fn snapshot(&self) -> Vec<Arc<dyn RequiredOption>> {
        self.required
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for OptionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsStore")
            .field("required", &self.required_keys())
            .finish()
    }
}
