//! pgsession - inspect and maintain sessions stored in a PostgREST table.
//!
//! Main entry point for the pgsession CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use postgrest_session::StoreConfig;

mod commands;

use commands::{destroy, get, prune, set, touch, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// pgsession - PostgREST session store operator tool
#[derive(Parser)]
#[command(name = "pgsession")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Store configuration file (TOML)
    #[arg(short, long, global = true, env = "PGSESSION_CONFIG")]
    pub config: Option<PathBuf>,

    /// PostgREST base URL (default: http://localhost:6000)
    #[arg(long, global = true, env = "PGSESSION_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a live session payload
    Get(get::GetArgs),

    /// Create or replace a session
    Set(set::SetArgs),

    /// Extend a session's expiry
    Touch(touch::TouchArgs),

    /// Delete a session
    Destroy(destroy::DestroyArgs),

    /// Run one prune pass
    Prune(prune::PruneArgs),

    /// Run the background pruner until interrupted
    Watch(watch::WatchArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "pgsession=debug,postgrest_session=debug,postgrest_client=debug,info"
    } else {
        "pgsession=info,postgrest_session=info,postgrest_client=info,warn"
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url);
    }

    let ctx = commands::Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Get(args) => get::run(args, &ctx).await,
        Commands::Set(args) => set::run(args, &ctx).await,
        Commands::Touch(args) => touch::run(args, &ctx).await,
        Commands::Destroy(args) => destroy::run(args, &ctx).await,
        Commands::Prune(args) => prune::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
    }
}
