//! The typed option handle

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::cache::Cache;
use super::resolve::Resolve;
use super::store::{self, OptionRecord};
use super::transformer::Transformer;
use super::value::OptionValue;
use crate::db::{Database, IsolationLevel, UnitOfWork};
use crate::error::{OptionError, OptionResult};

/// A named, typed option bound to one database
///
/// Cloning is cheap; clones share the cache.
pub struct ConfigOption<T: OptionValue> {
    inner: Arc<Inner<T>>,
}

struct Inner<T: OptionValue> {
    key: String,
    transformer: Transformer<T::Scalar>,
    cache: Option<Cache<T>>,
    database: Database,
    isolation: Option<IsolationLevel>,
    rule: Arc<dyn Resolve<T>>,
}

impl<T: OptionValue> Clone for ConfigOption<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: OptionValue> fmt::Debug for ConfigOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("key", &self.inner.key)
            .field("type", &std::any::type_name::<T>())
            .field("database", &self.inner.database.name())
            .field("cache", &self.cache_duration())
            .finish()
    }
}

impl<T: OptionValue> ConfigOption<T> {
    pub(crate) fn new(
        key: String,
        transformer: Transformer<T::Scalar>,
        cache_duration: Option<Duration>,
        database: Database,
        isolation: Option<IsolationLevel>,
        rule: Arc<dyn Resolve<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                key,
                transformer,
                cache: cache_duration.map(Cache::new),
                database,
                isolation,
                rule,
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn transformer(&self) -> &Transformer<T::Scalar> {
        &self.inner.transformer
    }

    pub fn database(&self) -> &Database {
        &self.inner.database
    }

    /// Effective isolation for this option's units of work
    pub fn isolation(&self) -> IsolationLevel {
        self.inner
            .isolation
            .unwrap_or_else(|| self.inner.database.default_isolation())
    }

    pub fn cache_duration(&self) -> Option<Duration> {
        self.inner.cache.as_ref().map(Cache::duration)
    }

    /// Non-nullable options take part in `check_required`
    pub fn is_required(&self) -> bool {
        !T::NULLABLE
    }

    pub(crate) fn cache(&self) -> Option<&Cache<T>> {
        self.inner.cache.as_ref()
    }

    /// Open a unit of work on this option's database
    pub async fn begin(&self) -> OptionResult<UnitOfWork> {
        self.inner.database.begin(self.inner.isolation).await
    }

    /// Read through the cache, running the resolution rule on a miss
    pub async fn value(&self) -> OptionResult<T> {
        match &self.inner.cache {
            Some(cache) => cache.get_or_compute(|| self.resolve()).await,
            None => self.resolve().await,
        }
    }

    /// Run the resolution rule in its own unit of work, ignoring the cache
    pub(crate) async fn resolve(&self) -> OptionResult<T> {
        let mut uow = self.begin().await?;
        let result = self.inner.rule.resolve(self, &mut uow).await;
        uow.finish(result).await
    }

    /// Persist `value` and, once committed, cache it
    pub async fn set(&self, value: T) -> OptionResult<&Self> {
        let mut uow = self.begin().await?;
        let result = self.store_in(&mut uow, &value).await;
        uow.finish(result).await?;

        if let Some(cache) = &self.inner.cache {
            cache.put(value);
        }
        Ok(self)
    }

    /// Drop the cached value so the next read goes to the database
    pub fn refresh(&self) -> &Self {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate();
            log::debug!("Refreshed option: {}", self.inner.key);
        }
        self
    }

    /// The raw row for this key, if any
    pub async fn record_in(&self, uow: &mut UnitOfWork) -> OptionResult<Option<OptionRecord>> {
        Ok(store::select_by_key(uow.conn(), &self.inner.key).await?)
    }

    /// Stored value inside `uow`; a missing row and a null value both read as `None`
    pub async fn get_or_null_in(&self, uow: &mut UnitOfWork) -> OptionResult<Option<T::Scalar>> {
        let Some(raw) = self.record_in(uow).await?.and_then(|record| record.value) else {
            return Ok(None);
        };

        self.inner
            .transformer
            .wrap(&raw)
            .map(Some)
            .map_err(|err| OptionError::transform(self.key(), err))
    }

    pub async fn get_or_throw_in(&self, uow: &mut UnitOfWork) -> OptionResult<T::Scalar> {
        self.get_or_null_in(uow)
            .await?
            .ok_or_else(|| OptionError::required_missing(self.key()))
    }

    /// Write inside `uow`; the cache is left alone until the caller commits
    pub async fn store_in(&self, uow: &mut UnitOfWork, value: &T) -> OptionResult<()> {
        let text = value
            .as_scalar()
            .map(|scalar| self.inner.transformer.unwrap(scalar));
        store::upsert(uow.conn(), &self.inner.key, text.as_deref()).await?;

        log::debug!("Set option: {} = {:?}", self.inner.key, text);
        Ok(())
    }

    /// Stored value, or `default` written inside `uow`
    ///
    /// The flag reports whether a row was written. A null default is returned
    /// without writing.
    pub async fn get_or_set_in(&self, uow: &mut UnitOfWork, default: T) -> OptionResult<(T, bool)> {
        if let Some(stored) = self.get_or_null_in(uow).await? {
            return Ok((T::from_scalar(stored), false));
        }
        if default.as_scalar().is_none() {
            return Ok((default, false));
        }

        self.store_in(uow, &default).await?;
        Ok((default, true))
    }
}
