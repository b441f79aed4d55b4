//! Treemake command-line interface

mod commands;

use clap::Parser;
use commands::{CacheOperation, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "treemake=debug,convenient_cache=debug"
    } else {
        "treemake=info,convenient_cache=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let success = match cli.command {
        Commands::Make {
            targets,
            force,
            jobs,
            mode,
        } => commands::make::make(&cli.dir, &mode, targets, force, jobs).await?,
        Commands::Clean { targets, mode } => {
            commands::clean::clean(&cli.dir, &mode, &targets)?;
            true
        }
        Commands::Cache { mode, operation } => {
            match operation {
                CacheOperation::Info => commands::cache::info(&cli.dir, &mode)?,
                CacheOperation::Clear => commands::cache::clear(&cli.dir, &mode)?,
            }
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
