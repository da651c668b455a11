//! Typed options persisted in a SQLite table
//!
//! Each option is a named, typed handle bound to a [`Database`]. Values are
//! stored as text through a [`Transformer`], read through a resolution rule
//! and an optional time-bounded cache, and written inside a [`UnitOfWork`].
//!
//! ```rust,no_run
//! use optstore::{Database, OptionsContext, db};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pool = db::connect_memory().await?;
//! db::run_migrations(&pool).await?;
//! let context = OptionsContext::new(Database::new("main", pool));
//!
//! let greeting = context.declare::<String>("greeting")?;
//! greeting.set("hello".to_string()).await?;
//! assert_eq!(greeting.value().await?, "hello");
//!
//! context.check_required().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod options;

pub use config::StoreConfig;
pub use db::{Database, IsolationLevel, UnitOfWork};
pub use error::{OptionError, OptionResult, TransformError, UnsupportedType};
pub use options::{
    Cache, ConfigOption, Number, NumericOp, OptionBuilder, OptionRecord, OptionValue,
    OptionsContext, OptionsStore, OrNull, OrSet, OrThrow, Resolve, Scalar, Transformer,
    TransformerRegistry,
};
