use anyhow::{Context, Result};
use colored::*;
use optstore::migrations::MigrationManager;
use optstore::options::store;
use optstore::{Database, TransformerRegistry, db};

use crate::cli::{MigrateSubcommands, ValueKind};

pub async fn get_command(database: &Database, key: &str) -> Result<()> {
    let mut uow = database.begin(None).await?;
    let record = store::select_by_key(uow.conn(), key)
        .await
        .with_context(|| format!("Failed to read option '{}'", key))?;
    uow.commit().await?;

    match record {
        Some(record) => match record.value {
            Some(value) => println!("{}", value),
            None => println!("{}", "(null)".dimmed()),
        },
        None => anyhow::bail!("Option '{}' is not set", key),
    }
    Ok(())
}

pub async fn set_command(database: &Database, key: &str, value: &str, kind: ValueKind) -> Result<()> {
    let registry = TransformerRegistry::with_builtins();
    let canonical = kind.canonicalize(&registry, value)?;

    let mut uow = database.begin(None).await?;
    store::upsert(uow.conn(), key, Some(&canonical))
        .await
        .with_context(|| format!("Failed to write option '{}'", key))?;
    uow.commit().await?;

    println!(
        "{} {} = {}",
        "✓".bright_green().bold(),
        key.bright_white().bold(),
        canonical
    );
    Ok(())
}

pub async fn list_command(database: &Database) -> Result<()> {
    let mut uow = database.begin(None).await?;
    let records = store::list(uow.conn()).await.context("Failed to list options")?;
    uow.commit().await?;

    if records.is_empty() {
        println!("{}", "No options stored".bright_yellow());
        return Ok(());
    }

    for record in records {
        let value = match record.value {
            Some(value) => value.as_str().normal(),
            None => "(null)".dimmed(),
        };
        println!("{} = {}", record.key.as_str().bright_white().bold(), value);
    }
    Ok(())
}

pub async fn migrate_command(database: &Database, command: MigrateSubcommands) -> Result<()> {
    let manager = MigrationManager::new(database.pool());

    match command {
        MigrateSubcommands::Up => {
            manager.migrate_up().await?;
            println!("{} Schema is up to date", "✓".bright_green().bold());
        }
        MigrateSubcommands::Down { to } => {
            manager.migrate_down(to).await?;
            println!(
                "{} Rolled back to version {}",
                "✓".bright_green().bold(),
                to.unwrap_or(0)
            );
        }
        MigrateSubcommands::Status => manager.status().await?.print_status(),
        MigrateSubcommands::Validate => {
            manager.validate().await?;
            println!("{} Schema is consistent", "✓".bright_green().bold());
        }
    }
    Ok(())
}

pub async fn info_command(database: &Database) -> Result<()> {
    let info = db::database_info(database.pool()).await?;

    println!("{}", "Database:".bright_white().bold());
    println!("  Path: {}", database.name());
    println!("  SQLite version: {}", info.sqlite_version);
    println!("  Schema version: {}", info.schema_version);
    println!("  Tables: {}", info.table_count);
    println!("  Page size: {}", info.page_size);
    println!("  Journal mode: {}", info.journal_mode);
    println!("  Default isolation: {}", database.default_isolation());
    Ok(())
}
