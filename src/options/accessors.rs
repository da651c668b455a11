//! Direct read accessors and numeric mutation
//!
//! The direct accessors bypass the cache and the resolution rule. Numeric
//! mutation runs the rule against storage, never the cache, and writes
//! through `set()`, which updates the cache.

use super::option::ConfigOption;
use super::value::{ArithmeticError, Number, NumericOp, OptionValue, Scalar};
use crate::error::{OptionError, OptionResult};

impl<T: OptionValue> ConfigOption<T> {
    /// Stored value, `None` when there is no row or the row holds null
    ///
    /// Never creates a row.
    pub async fn get_or_null(&self) -> OptionResult<Option<T::Scalar>> {
        let mut uow = self.begin().await?;
        let result = self.get_or_null_in(&mut uow).await;
        uow.finish(result).await
    }

    pub async fn get_or_throw(&self) -> OptionResult<T::Scalar> {
        let mut uow = self.begin().await?;
        let result = self.get_or_throw_in(&mut uow).await;
        uow.finish(result).await
    }

    /// Stored value, or `default` after writing it
    ///
    /// A stored value always wins over the default. A null default is
    /// returned without creating a row.
    pub async fn get_or_set(&self, default: T) -> OptionResult<T> {
        let mut uow = self.begin().await?;
        let result = self.get_or_set_in(&mut uow, default).await;
        let (value, written) = uow.finish(result).await?;

        if written {
            if let Some(cache) = self.cache() {
                cache.put(value.clone());
            }
        }
        Ok(value)
    }

    pub async fn increment(&self) -> OptionResult<&Self> {
        self.mutate(NumericOp::Add, None, "increment").await
    }

    pub async fn decrement(&self) -> OptionResult<&Self> {
        self.mutate(NumericOp::Sub, None, "decrement").await
    }

    pub async fn add_assign(&self, operand: T::Scalar) -> OptionResult<&Self> {
        self.mutate(NumericOp::Add, Some(operand), NumericOp::Add.name())
            .await
    }

    pub async fn sub_assign(&self, operand: T::Scalar) -> OptionResult<&Self> {
        self.mutate(NumericOp::Sub, Some(operand), NumericOp::Sub.name())
            .await
    }

    pub async fn mul_assign(&self, operand: T::Scalar) -> OptionResult<&Self> {
        self.mutate(NumericOp::Mul, Some(operand), NumericOp::Mul.name())
            .await
    }

    pub async fn div_assign(&self, operand: T::Scalar) -> OptionResult<&Self> {
        self.mutate(NumericOp::Div, Some(operand), NumericOp::Div.name())
            .await
    }

    pub async fn rem_assign(&self, operand: T::Scalar) -> OptionResult<&Self> {
        self.mutate(NumericOp::Rem, Some(operand), NumericOp::Rem.name())
            .await
    }

    /// Read, apply `op`, write back; a null current value is left untouched
    ///
    /// `operand` of `None` means one of the current value's kind.
    async fn mutate(
        &self,
        op: NumericOp,
        operand: Option<T::Scalar>,
        operation: &'static str,
    ) -> OptionResult<&Self> {
        let unsupported = || OptionError::UnsupportedOperation {
            key: self.key().to_string(),
            operation,
            type_name: std::any::type_name::<T>(),
        };

        // Checked before touching storage
        if !<T::Scalar as Scalar>::NUMERIC {
            return Err(unsupported());
        }

        let Some(current) = self.resolve().await?.into_scalar() else {
            log::debug!("Option {} is null, {} skipped", self.key(), operation);
            return Ok(self);
        };

        let lhs = current.to_number().ok_or_else(unsupported)?;
        let rhs = match operand {
            Some(operand) => operand.to_number().ok_or_else(unsupported)?,
            None => lhs.one_like(),
        };
        let result: Number = lhs.apply(op, rhs).map_err(|err| match err {
            ArithmeticError::KindMismatch => unsupported(),
            ArithmeticError::OutOfRange => OptionError::Arithmetic {
                key: self.key().to_string(),
                operation,
            },
        })?;
        let next = <T::Scalar as Scalar>::from_number(result).ok_or_else(unsupported)?;

        self.set(T::from_scalar(next)).await
    }
}
