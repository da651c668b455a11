//! Text <-> value converters and the per-type registry

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::value::Scalar;
use crate::error::{TransformError, UnsupportedType};

type UnwrapFn<T> = dyn Fn(&T) -> String + Send + Sync;
type WrapFn<T> = dyn Fn(&str) -> Result<T, TransformError> + Send + Sync;

/// Bidirectional converter between stored text and a typed value
///
/// `wrap(unwrap(v))` must give back `v` for every value the converter is
/// meant for. `wrap` may fail on malformed text; `unwrap` never fails.
pub struct Transformer<T> {
    unwrap: Arc<UnwrapFn<T>>,
    wrap: Arc<WrapFn<T>>,
}

impl<T> Clone for Transformer<T> {
    fn clone(&self) -> Self {
        Self {
            unwrap: Arc::clone(&self.unwrap),
            wrap: Arc::clone(&self.wrap),
        }
    }
}

impl<T> fmt::Debug for Transformer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: 'static> Transformer<T> {
    pub fn new(
        unwrap: impl Fn(&T) -> String + Send + Sync + 'static,
        wrap: impl Fn(&str) -> Result<T, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            unwrap: Arc::new(unwrap),
            wrap: Arc::new(wrap),
        }
    }

    /// Value -> stored text
    pub fn unwrap(&self, value: &T) -> String {
        (self.unwrap)(value)
    }

    /// Stored text -> value
    pub fn wrap(&self, raw: &str) -> Result<T, TransformError> {
        (self.wrap)(raw)
    }

    /// Canonical `Display` text, parsed back with `FromStr`
    pub fn parsed() -> Self
    where
        T: Display + FromStr,
        T::Err: Display,
    {
        Self::new(
            |value: &T| value.to_string(),
            |raw| raw.parse::<T>().map_err(|e| TransformError::new::<T>(raw, e)),
        )
    }

    /// Stored as the exact variant name; any other text fails
    pub fn enumeration(variants: &'static [T], name: fn(&T) -> &'static str) -> Self
    where
        T: Clone + Send + Sync,
    {
        Self::new(
            move |value: &T| name(value).to_string(),
            move |raw| {
                variants
                    .iter()
                    .find(|&variant| name(variant) == raw)
                    .cloned()
                    .ok_or_else(|| {
                        TransformError::new::<T>(raw, "does not match any enum variant")
                    })
            },
        )
    }
}

/// Memoized transformers keyed by value type
///
/// Shared across the whole context. Concurrent first lookups of one type may
/// both build a converter; the first one inserted wins.
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl TransformerRegistry {
    /// An empty registry; built-ins are still created on first request
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in scalar converter already in place
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.preload::<i8>();
        registry.preload::<i16>();
        registry.preload::<i32>();
        registry.preload::<i64>();
        registry.preload::<u8>();
        registry.preload::<u16>();
        registry.preload::<u32>();
        registry.preload::<u64>();
        registry.preload::<f32>();
        registry.preload::<f64>();
        registry.preload::<Decimal>();
        registry.preload::<bool>();
        registry.preload::<char>();
        registry.preload::<String>();
        registry.preload::<NaiveDate>();
        registry.preload::<NaiveTime>();
        registry.preload::<NaiveDateTime>();
        registry.preload::<DateTime<Utc>>();
        registry
    }

    fn preload<S: Scalar>(&self) {
        if let Some(transformer) = S::builtin_transformer() {
            self.insert(transformer, false);
        }
    }

    /// Install a caller-supplied converter for `S`, replacing any existing one
    pub fn register<S: Scalar>(&self, transformer: Transformer<S>) {
        log::debug!("Registered transformer for {}", std::any::type_name::<S>());
        self.insert(transformer, true);
    }

    /// Converter for `S`, building and memoizing the built-in on first request
    pub fn get_or_create<S: Scalar>(&self) -> Result<Transformer<S>, UnsupportedType> {
        if let Some(transformer) = self.get::<S>() {
            return Ok(transformer);
        }

        let transformer = S::builtin_transformer().ok_or(UnsupportedType {
            type_name: std::any::type_name::<S>(),
        })?;
        Ok(self.insert(transformer, false))
    }

    pub fn get<S: Scalar>(&self) -> Option<Transformer<S>> {
        self.transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.downcast_ref::<Transformer<S>>())
            .cloned()
    }

    pub fn contains<S: Scalar>(&self) -> bool {
        self.transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the transformer that ends up stored for `S`
    fn insert<S: Scalar>(&self, transformer: Transformer<S>, replace: bool) -> Transformer<S> {
        let mut transformers = self
            .transformers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let key = TypeId::of::<S>();

        if !replace {
            if let Some(existing) = transformers
                .get(&key)
                .and_then(|entry| entry.downcast_ref::<Transformer<S>>())
            {
                return existing.clone();
            }
        }

        transformers.insert(key, Arc::new(transformer.clone()));
        transformer
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
