//! Command-line entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use backwatch::commands;

#[derive(Parser)]
#[command(
    name = "backwatch",
    version,
    about = "Keep an HAProxy backend block in sync with a Docker network"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the network and reconcile continuously
    Run,
    /// Run a single reconciliation pass and exit
    Sync {
        /// Print the assembled config to stdout instead of applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Diagnose configuration and environment problems
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run => commands::run::execute().await,
        Commands::Sync { dry_run } => commands::sync::execute(dry_run).await,
        Commands::Check => commands::check::execute().await,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("backwatch=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
