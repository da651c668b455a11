//! Shared state that options are declared against

use std::sync::Arc;

use super::builder::OptionBuilder;
use super::option::ConfigOption;
use super::store::OptionsStore;
use super::transformer::TransformerRegistry;
use super::value::OptionValue;
use crate::db::Database;
use crate::error::OptionResult;

/// Default database, transformer registry and required-option store
///
/// Create one per process (or per test) and pass it to whatever declares
/// options. Clones share all three.
#[derive(Debug, Clone)]
pub struct OptionsContext {
    database: Database,
    transformers: Arc<TransformerRegistry>,
    store: OptionsStore,
}

impl OptionsContext {
    /// Context with the built-in transformers registered
    pub fn new(database: Database) -> Self {
        Self::with_registry(database, Arc::new(TransformerRegistry::with_builtins()))
    }

    pub fn with_registry(database: Database, transformers: Arc<TransformerRegistry>) -> Self {
        Self {
            database,
            transformers,
            store: OptionsStore::new(),
        }
    }

    /// Database used by options that do not name one
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn transformers(&self) -> &TransformerRegistry {
        &self.transformers
    }

    pub fn store(&self) -> &OptionsStore {
        &self.store
    }

    pub fn option<T: OptionValue>(&self, key: impl Into<String>) -> OptionBuilder<'_, T> {
        OptionBuilder::new(self, key.into())
    }

    /// Declare with every setting at its default
    pub fn declare<T: OptionValue>(&self, key: impl Into<String>) -> OptionResult<ConfigOption<T>> {
        self.option(key).declare()
    }

    pub async fn check_required(&self) -> OptionResult<()> {
        self.store.check_required().await
    }

    pub fn clear_required(&self) {
        self.store.clear_required();
    }
}
