//! ghi - install tools from GitHub release assets

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ghi_cli::cmd;
use ghi_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `--json` output stays a single stdout line.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Install { recipe, json } => cmd::install::install(&recipe, json, dry_run, quiet).await,
        Commands::Select { recipe } => cmd::select::select(&recipe, quiet).await,
        Commands::Host => {
            cmd::host::host();
            Ok(())
        }
    }
}
