//! Store configuration loaded from TOML and environment overrides

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::{self, Database, IsolationLevel};

pub const DATABASE_ENV: &str = "OPTSTORE_DATABASE";
pub const ISOLATION_ENV: &str = "OPTSTORE_ISOLATION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub isolation: IsolationLevel,
    pub max_connections: u32,
    /// Apply pending migrations when the database is opened
    pub migrate_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            isolation: IsolationLevel::default(),
            max_connections: 5,
            migrate_on_open: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("optstore"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("options.db")
}

impl StoreConfig {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("optstore").join("config.toml"))
    }

    /// Config file (if any) with environment overrides applied
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            debug!("No config file at {:?}, using defaults", config_path);
            Self::default()
        };

        config.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `OPTSTORE_*` overrides looked up through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(DATABASE_ENV).filter(|path| !path.trim().is_empty()) {
            debug!("{} overrides database path: {}", DATABASE_ENV, path);
            self.database_path = PathBuf::from(path);
        }
        if let Some(isolation) = lookup(ISOLATION_ENV) {
            self.isolation = isolation
                .parse()
                .with_context(|| format!("Invalid {}", ISOLATION_ENV))?;
        }
        Ok(self)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).with_context(|| format!("Failed to write config file: {:?}", path))?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Connect, migrate if configured, and wrap the pool as a [`Database`]
    pub async fn open(&self) -> Result<Database> {
        if let Some(parent) = self.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
                info!("Created data directory: {:?}", parent);
            }
        }

        let pool = db::connect(&self.database_path, self.max_connections).await?;
        if self.migrate_on_open {
            db::run_migrations(&pool).await?;
        }

        let name = self.database_path.display().to_string();
        Ok(Database::new(name, pool).with_default_isolation(self.isolation))
    }
}
