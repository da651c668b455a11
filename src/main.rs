use anyhow::Result;
use clap::Parser;
use log::{debug, info};

mod cli;
mod commands;

use cli::{Cli, Commands};
use optstore::StoreConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = StoreConfig::load()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    // Migration commands drive the schema themselves
    if matches!(cli.command, Commands::Migrate(_)) {
        config.migrate_on_open = false;
    }
    debug!("Using config: {:?}", config);

    let database = config.open().await?;
    info!("Opened options database: {}", database.name());

    let result = match cli.command {
        Commands::Get { key } => commands::get_command(&database, &key).await,
        Commands::Set { key, value, kind } => {
            commands::set_command(&database, &key, &value, kind).await
        }
        Commands::List => commands::list_command(&database).await,
        Commands::Migrate(migrate) => commands::migrate_command(&database, migrate.command).await,
        Commands::Info => commands::info_command(&database).await,
    };

    database.close().await;
    result
}
