mod import;
mod jobs;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::import::ImportCommands;
use crate::jobs::JobsCommands;

#[derive(Debug, Parser)]
#[command(name = "bazaar")]
#[command(about = "Marketplace catalog import tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import catalog items from the fulfillment provider
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Inspect bulk import jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("bazaar: no command given; run `bazaar --help` for usage");
        return Ok(());
    };

    let config = bazaar_core::load_app_config()?;
    init_tracing(&config.log_level);
    tracing::debug!(env = %config.env, "configuration loaded");

    match command {
        Commands::Db { command } => run_db(&config, command).await,
        Commands::Import { command } => import::run_import(&config, command).await,
        Commands::Jobs { command } => jobs::run_jobs(&config, command).await,
    }
}

/// `RUST_LOG` wins when set; otherwise `BAZAAR_LOG_LEVEL` from config.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub(crate) async fn connect(config: &bazaar_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = bazaar_db::connect_pool(
        config.require_database_url()?,
        bazaar_db::PoolConfig::from_app_config(config),
    )
    .await?;
    Ok(pool)
}

async fn run_db(config: &bazaar_core::AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Ping => {
            bazaar_db::ping(&pool).await?;
            println!("database is reachable");
        }
        DbCommands::Migrate => {
            let applied = bazaar_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    pool.close().await;
    Ok(())
}
