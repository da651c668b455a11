//! Resolution rules: what reading an option's value means

use async_trait::async_trait;

use super::option::ConfigOption;
use super::value::{OptionValue, Scalar};
use crate::db::UnitOfWork;
use crate::error::OptionResult;

/// Produces an option's value inside a unit of work
///
/// Implementations should use the `*_in` primitives on [`ConfigOption`] so
/// every read and write lands in `uow`.
#[async_trait]
pub trait Resolve<T: OptionValue>: Send + Sync {
    async fn resolve(&self, option: &ConfigOption<T>, uow: &mut UnitOfWork) -> OptionResult<T>;
}

/// Fail with `RequiredMissing` when nothing is stored
#[derive(Debug, Clone, Copy, Default)]
pub struct OrThrow;

#[async_trait]
impl<T: OptionValue> Resolve<T> for OrThrow {
    async fn resolve(&self, option: &ConfigOption<T>, uow: &mut UnitOfWork) -> OptionResult<T> {
        option.get_or_throw_in(uow).await.map(T::from_scalar)
    }
}

/// Read absent values as null
#[derive(Debug, Clone, Copy, Default)]
pub struct OrNull;

#[async_trait]
impl<S: Scalar> Resolve<Option<S>> for OrNull {
    async fn resolve(
        &self,
        option: &ConfigOption<Option<S>>,
        uow: &mut UnitOfWork,
    ) -> OptionResult<Option<S>> {
        option.get_or_null_in(uow).await
    }
}

/// Write the default when nothing is stored
#[derive(Debug, Clone)]
pub struct OrSet<T>(pub T);

#[async_trait]
impl<T: OptionValue> Resolve<T> for OrSet<T> {
    async fn resolve(&self, option: &ConfigOption<T>, uow: &mut UnitOfWork) -> OptionResult<T> {
        let (value, _) = option.get_or_set_in(uow, self.0.clone()).await?;
        Ok(value)
    }
}
