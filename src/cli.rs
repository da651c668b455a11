use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use optstore::{Scalar, TransformerRegistry};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "optstore")]
#[command(about = "Inspect and edit a typed options database")]
pub struct Cli {
    /// Database file, overriding the config file and OPTSTORE_DATABASE
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the stored text of an option
    Get {
        /// Option key
        key: String,
    },
    /// Store a value after validating it as the given kind
    Set {
        /// Option key
        key: String,
        /// Value text
        value: String,
        /// Kind used to validate and canonicalize the value
        #[arg(long, value_enum, default_value_t = ValueKind::String)]
        kind: ValueKind,
    },
    /// List every stored option
    List,
    /// Schema migration management
    Migrate(MigrateCommands),
    /// Show database information
    Info,
}

#[derive(Args)]
pub struct MigrateCommands {
    #[command(subcommand)]
    pub command: MigrateSubcommands,
}

#[derive(Subcommand)]
pub enum MigrateSubcommands {
    /// Apply all pending migrations
    Up,
    /// Roll back migrations
    Down {
        /// Version to roll back to (all the way down if omitted)
        #[arg(long)]
        to: Option<i64>,
    },
    /// Show applied and pending migrations
    Status,
    /// Check checksums and the options table definition
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueKind {
    String,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Date,
    Time,
    DateTime,
    Timestamp,
}

impl ValueKind {
    /// Parse `raw` as this kind and render it back in canonical form
    pub fn canonicalize(self, registry: &TransformerRegistry, raw: &str) -> Result<String> {
        match self {
            ValueKind::String => round_trip::<String>(registry, raw),
            ValueKind::Bool => round_trip::<bool>(registry, raw),
            ValueKind::Char => round_trip::<char>(registry, raw),
            ValueKind::I8 => round_trip::<i8>(registry, raw),
            ValueKind::I16 => round_trip::<i16>(registry, raw),
            ValueKind::I32 => round_trip::<i32>(registry, raw),
            ValueKind::I64 => round_trip::<i64>(registry, raw),
            ValueKind::U8 => round_trip::<u8>(registry, raw),
            ValueKind::U16 => round_trip::<u16>(registry, raw),
            ValueKind::U32 => round_trip::<u32>(registry, raw),
            ValueKind::U64 => round_trip::<u64>(registry, raw),
            ValueKind::F32 => round_trip::<f32>(registry, raw),
            ValueKind::F64 => round_trip::<f64>(registry, raw),
            ValueKind::Decimal => round_trip::<Decimal>(registry, raw),
            ValueKind::Date => round_trip::<NaiveDate>(registry, raw),
            ValueKind::Time => round_trip::<NaiveTime>(registry, raw),
            ValueKind::DateTime => round_trip::<NaiveDateTime>(registry, raw),
            ValueKind::Timestamp => round_trip::<DateTime<Utc>>(registry, raw),
        }
    }
}

fn round_trip<S: Scalar>(registry: &TransformerRegistry, raw: &str) -> Result<String> {
    let transformer = registry.get_or_create::<S>()?;
    let value = transformer.wrap(raw)?;
    Ok(transformer.unwrap(&value))
}
