mod enrich;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "addrgeo")]
#[command(about = "Geocode partner addresses into the enriched address table")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one enrichment pass over every source address.
    Enrich {
        /// Successful inserts between checkpoint commits (overrides ADDRGEO_BATCH_SIZE).
        #[arg(long)]
        batch_size: Option<usize>,
        /// Pause after each record in milliseconds (overrides ADDRGEO_REQUEST_DELAY_MS).
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Geocode without writing anything to the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable.
    Ping,
    /// Apply pending schema migrations.
    Migrate,
}

/// Fails before any connection is opened when `command` needs a setting the
/// loaded config lacks. Only `enrich` talks to the geocoding API, so `db`
/// commands run without a key.
fn check_command_config(
    command: &Commands,
    config: &addrgeo_core::AppConfig,
) -> Result<(), addrgeo_core::ConfigError> {
    if matches!(command, Commands::Enrich { .. }) {
        config.require_geocode_api_key()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = addrgeo_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "configuration loaded");
    check_command_config(&cli.command, &config)?;

    let pool_config = addrgeo_db::PoolConfig::from_app_config(&config);
    let pool = addrgeo_db::connect_pool(&config.database_url, pool_config).await?;

    let result = match cli.command {
        Commands::Enrich {
            batch_size,
            delay_ms,
            dry_run,
        } => {
            let args = enrich::EnrichArgs {
                batch_size,
                delay_ms,
                dry_run,
            };
            enrich::run_enrich(&pool, &config, &args).await
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => addrgeo_db::ping(&pool)
            .await
            .map(|()| println!("database reachable"))
            .map_err(anyhow::Error::from),
        Commands::Db {
            command: DbCommands::Migrate,
        } => addrgeo_db::run_migrations(&pool)
            .await
            .map(|applied| println!("applied {applied} migration(s)"))
            .map_err(anyhow::Error::from),
    };

    pool.close().await;
    result
}

#[cfg(test)]
mod tests;
