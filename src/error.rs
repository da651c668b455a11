//! Error types for typed option access

use thiserror::Error;

/// A stored string could not be converted into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {input:?} to {type_name}: {reason}")]
pub struct TransformError {
    pub type_name: &'static str,
    pub input: String,
    pub reason: String,
}

impl TransformError {
    /// Create a transform error for target type `T`
    pub fn new<T: ?Sized>(input: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

/// No built-in transformer exists for a type and none was registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no transformer available for type {type_name}, provide a custom transformer")]
pub struct UnsupportedType {
    pub type_name: &'static str,
}

/// Errors raised by options, the options store and transformers
#[derive(Debug, Error)]
pub enum OptionError {
    /// The option has no stored row (or a null value where one is required)
    #[error("Required option {key} is not set in database")]
    RequiredMissing { key: String },

    /// `check_required` found one or more unset options
    #[error("Required options {} are not set in database", keys.join(", "))]
    RequiredMissingAggregate { keys: Vec<String> },

    /// The stored text for an option failed to convert
    #[error("Option {key} holds an unreadable value: {source}")]
    Transform {
        key: String,
        #[source]
        source: TransformError,
    },

    /// Declaration-time defect: no transformer for the option's type
    #[error("Option {key} cannot be declared: {source}")]
    UnsupportedType {
        key: String,
        #[source]
        source: UnsupportedType,
    },

    /// The operation is not defined for the option's value type
    #[error("Operation {operation} is not supported for option {key} of type {type_name}")]
    UnsupportedOperation {
        key: String,
        operation: &'static str,
        type_name: &'static str,
    },

    /// Checked arithmetic overflowed or divided by zero
    #[error("Operation {operation} on option {key} overflowed or divided by zero")]
    Arithmetic {
        key: String,
        operation: &'static str,
    },

    /// The key is empty or exceeds the column bound
    #[error("Invalid option key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// Failure reported by the database or its transaction machinery
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl OptionError {
    pub fn required_missing(key: impl Into<String>) -> Self {
        Self::RequiredMissing { key: key.into() }
    }

    pub fn transform(key: impl Into<String>, source: TransformError) -> Self {
        Self::Transform {
            key: key.into(),
            source,
        }
    }

    /// True for `RequiredMissing`, the only kind `check_required` folds into its report
    pub fn is_required_missing(&self) -> bool {
        matches!(self, Self::RequiredMissing { .. })
    }
}

/// Convenience alias for option results
pub type OptionResult<T> = Result<T, OptionError>;
