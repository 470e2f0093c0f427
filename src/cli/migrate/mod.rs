//! Migrate command - manages the PostgreSQL document tables

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::storage::{connect_pool, Migrator, PostgresMigrator, StorageConfig};

/// Arguments for the migrate command
#[derive(Args, Clone, Debug)]
pub struct MigrateArgs {
    /// Revert the most recent migration instead of applying pending ones
    #[arg(long, conflicts_with = "status")]
    pub revert: bool,

    /// Print the current schema version and exit
    #[arg(long)]
    pub status: bool,
}

/// Run the migrate command
pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let postgres = match config.storage.storage_config()? {
        StorageConfig::Postgres(postgres) => postgres,
        StorageConfig::InMemory => {
            anyhow::bail!("Migrations require storage.backend = \"postgres\"");
        }
    };

    let pool = connect_pool(&postgres).await?;
    let migrator = PostgresMigrator::new(pool);

    if args.status {
        match migrator.version().await? {
            Some(version) => info!(version, "Current schema version"),
            None => info!("No migrations applied"),
        }
    } else if args.revert {
        migrator.revert().await?;
        info!(version = ?migrator.version().await?, "Reverted last migration");
    } else {
        migrator.run().await?;
        info!(version = ?migrator.version().await?, "Migrations applied");
    }

    Ok(())
}
