//! migrate_cli — runs or reverts the Postgres schema migrations under
//! `./migrations` (spec §6 "Persistence").

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::migrate::Migrate;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use queuedesk_core::Config;

#[derive(Parser)]
#[command(name = "migrate_cli")]
#[command(about = "Runs queuedesk's Postgres schema migrations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations.
    Run,
    /// Revert the most recently applied migration.
    Revert,
    /// List migrations and whether they have been applied.
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.store_uri)
        .await
        .context("failed to connect to store")?;

    let migrator = sqlx::migrate!("./migrations");

    match cli.command {
        Commands::Run => {
            migrator.run(&pool).await.context("migration run failed")?;
            tracing::info!("migrations applied");
        }
        Commands::Revert => {
            migrator.undo(&pool, i64::MAX).await.context("migration revert failed")?;
            tracing::info!("last migration reverted");
        }
        Commands::Info => {
            let mut conn = pool.acquire().await?;
            let applied = conn.list_applied_migrations().await.context("failed to list applied migrations")?;
            for migration in migrator.iter() {
                let is_applied = applied.iter().any(|a| a.version == migration.version);
                println!(
                    "{:<20} {:<50} {}",
                    migration.version,
                    migration.description,
                    if is_applied { "applied" } else { "pending" }
                );
            }
        }
    }

    Ok(())
}
