//! Declaration of options with their transformer, cache, database and rule

use std::sync::Arc;
use std::time::Duration;

use super::context::OptionsContext;
use super::option::ConfigOption;
use super::resolve::{OrNull, OrSet, OrThrow, Resolve};
use super::store::MAX_KEY_LENGTH;
use super::transformer::Transformer;
use super::value::{OptionValue, Scalar};
use crate::db::{Database, IsolationLevel};
use crate::error::{OptionError, OptionResult};

/// Builder returned by [`OptionsContext::option`]
///
/// ```rust,no_run
/// # async fn demo(context: optstore::OptionsContext) -> optstore::OptionResult<()> {
/// use std::time::Duration;
///
/// let retries = context
///     .option::<u32>("retries")
///     .cache_for(Duration::from_secs(30))
///     .or_set(3)
///     .declare()?;
///
/// assert_eq!(retries.value().await?, 3);
/// # Ok(())
/// # }
/// ```
#[must_use = "an option is only created by calling declare()"]
pub struct OptionBuilder<'ctx, T: OptionValue> {
    context: &'ctx OptionsContext,
    key: String,
    cache: Option<Duration>,
    transformer: Option<Transformer<T::Scalar>>,
    database: Option<Database>,
    isolation: Option<IsolationLevel>,
    rule: Option<Arc<dyn Resolve<T>>>,
}

impl<'ctx, T: OptionValue> OptionBuilder<'ctx, T> {
    pub(crate) fn new(context: &'ctx OptionsContext, key: String) -> Self {
        Self {
            context,
            key,
            cache: None,
            transformer: None,
            database: None,
            isolation: None,
            rule: None,
        }
    }

    pub fn cache_for(mut self, duration: Duration) -> Self {
        self.cache = Some(duration);
        self
    }

    /// Cache until `refresh` is called
    pub fn cache_forever(self) -> Self {
        self.cache_for(Duration::MAX)
    }

    /// Use this converter instead of the registry's
    pub fn transformer(mut self, transformer: Transformer<T::Scalar>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    /// Replace the default `OrThrow` rule
    pub fn resolve(mut self, rule: impl Resolve<T> + 'static) -> Self {
        self.rule = Some(Arc::new(rule));
        self
    }

    pub fn or_set(self, default: T) -> Self {
        self.resolve(OrSet(default))
    }

    pub fn declare(self) -> OptionResult<ConfigOption<T>> {
        validate_key(&self.key)?;

        let transformer = match self.transformer {
            Some(transformer) => transformer,
            None => self
                .context
                .transformers()
                .get_or_create::<T::Scalar>()
                .map_err(|source| OptionError::UnsupportedType {
                    key: self.key.clone(),
                    source,
                })?,
        };
        let database = self
            .database
            .unwrap_or_else(|| self.context.database().clone());
        let rule: Arc<dyn Resolve<T>> = match self.rule {
            Some(rule) => rule,
            None => Arc::new(OrThrow),
        };

        let option = ConfigOption::new(
            self.key,
            transformer,
            self.cache,
            database,
            self.isolation,
            rule,
        );

        if option.is_required() {
            self.context.store().track_required(&option);
        }
        log::debug!(
            "Declared option: {} ({}) on '{}'",
            option.key(),
            std::any::type_name::<T>(),
            option.database().name()
        );
        Ok(option)
    }
}

impl<'ctx, S: Scalar> OptionBuilder<'ctx, Option<S>> {
    /// Read absent values as null instead of failing
    pub fn or_null(self) -> Self {
        self.resolve(OrNull)
    }
}

fn validate_key(key: &str) -> OptionResult<()> {
    let reason = if key.is_empty() {
        "key must not be empty"
    } else if key.chars().count() > MAX_KEY_LENGTH {
        "key must be at most 255 characters"
    } else {
        return Ok(());
    };

    Err(OptionError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
