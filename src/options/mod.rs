//! Typed options persisted in the options table
//!
//! Options are declared against an [`OptionsContext`], read through their
//! resolution rule and cache with [`ConfigOption::value`], and written with
//! [`ConfigOption::set`].

mod accessors;
pub mod builder;
pub mod cache;
pub mod context;
pub mod option;
pub mod resolve;
pub mod store;
pub mod transformer;
pub mod value;

pub use builder::OptionBuilder;
pub use cache::Cache;
pub use context::OptionsContext;
pub use option::ConfigOption;
pub use resolve::{OrNull, OrSet, OrThrow, Resolve};
pub use store::{OptionRecord, OptionsStore, RequiredOption};
pub use transformer::{Transformer, TransformerRegistry};
pub use value::{ArithmeticError, Number, NumericOp, OptionValue, Scalar};
