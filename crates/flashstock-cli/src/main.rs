use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use flashstock_core::cache::HotStore;
use flashstock_core::db;
use flashstock_core::repository::{create_pool, PostgresAuditRepository};
use flashstock_core::reservation::ReservationEngine;
use flashstock_core::sweeper::ExpirySweeper;
use flashstock_core::{Config, Result};

#[derive(Parser)]
#[command(name = "flashstock")]
#[command(about = "Flash-sale inventory reservation service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Log level (error, warn, info, debug, trace)")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server, the expiry sweeper, and run pending migrations.
    Server {
        #[arg(short = 'H', long, help = "Bind address")]
        host: Option<String>,

        #[arg(short = 'P', long, help = "Port number")]
        port: Option<u16>,

        #[arg(long, help = "Skip automatic database migration on startup")]
        skip_migrate: bool,
    },

    /// Database operations.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Apply pending migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let mut config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else {
        Config::from_env()?
    };

    match cli.command {
        Commands::Server { host, port, skip_migrate } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            if !skip_migrate {
                run_migrations(&config).await?;
            }

            let sweeper_handle = spawn_sweeper(&config).await?;

            info!(host = %config.server.host, port = config.server.port, "starting flashstock");
            let result = flashstock_api::run(config).await;
            sweeper_handle.abort();
            result
        }
        Commands::Db { command } => match command {
            DbCommands::Migrate => run_migrations(&config).await,
        },
    }
}

async fn run_migrations(config: &Config) -> Result<()> {
    info!("running database migrations");
    let pool = create_pool(&config.database).await?;
    db::auto_migrate(&pool).await?;
    info!("migrations complete");
    Ok(())
}

/// The sweeper needs its own Redis/Postgres handles, independent of the
/// ones the API server opens for its own request handling.
async fn spawn_sweeper(config: &Config) -> Result<tokio::task::JoinHandle<()>> {
    let pool = create_pool(&config.database).await?;
    let audit: Arc<dyn flashstock_core::repository::AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pool));
    let hot_store = HotStore::new(config.redis.clone()).await?;
    let engine = Arc::new(ReservationEngine::new(
        hot_store.clone(),
        config.reservation.clone(),
        audit,
    ));
    let sweeper = Arc::new(ExpirySweeper::new(hot_store, engine, config.reservation.clone()));
    Ok(sweeper.start())
}
