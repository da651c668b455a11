//! Shared helpers for integration tests
#![allow(dead_code)]

use optstore::{Database, OptionsContext, db};

/// A fresh, migrated in-memory database
pub async fn memory_database(name: &str) -> Database {
    let pool = db::connect_memory().await.expect("in-memory database");
    db::run_migrations(&pool).await.expect("migrations");
    Database::new(name, pool)
}

pub async fn context() -> OptionsContext {
    OptionsContext::new(memory_database("main").await)
}

/// Stored text for `key`: `None` for no row, `Some(None)` for a null value
pub async fn raw_value(database: &Database, key: &str) -> Option<Option<String>> {
    sqlx::query_scalar::<_, Option<String>>("SELECT value FROM options WHERE key = ?")
        .bind(key)
        .fetch_optional(database.pool())
        .await
        .expect("select raw value")
}

/// Write a row behind the options' backs
pub async fn write_raw(database: &Database, key: &str, value: Option<&str>) {
    sqlx::query("INSERT OR REPLACE INTO options (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(database.pool())
        .await
        .expect("write raw value");
}

pub async fn row_count(database: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM options")
        .fetch_one(database.pool())
        .await
        .expect("count rows")
}
