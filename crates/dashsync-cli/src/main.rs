//! dashsync: keeps Grafana dashboards and a git repository in step.
//!
//! # Usage
//!
//! ```text
//! dashsync [--config config.yaml] pull [--every <seconds>]
//! dashsync [--config config.yaml] push [--delete-removed]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{pull::PullArgs, push::PushArgs};

#[derive(Parser, Debug)]
#[command(
    name = "dashsync",
    version,
    about = "Synchronize Grafana dashboards with a git repository",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short, global = true, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror Grafana dashboards into the repository.
    Pull(PullArgs),

    /// Push repository changes to Grafana as they arrive.
    Push(PushArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = dashsync::load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    dashsync::telemetry::init(&config.logging).context("failed to initialize logging")?;

    match cli.command {
        Commands::Pull(args) => args.run(config).await,
        Commands::Push(args) => args.run(config).await,
    }
}
