//! telas - command-line front end for the fabric roll inventory.

mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use telas_core::config::DEFAULT_BASE_URL;
use telas_core::{HttpRollRepository, ServiceConfig};

use commands::{Command, Output, Workspace};

/// Manage fabric rolls and plan cuts against the record service.
#[derive(Parser, Debug)]
#[command(name = "telas")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the record service
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-call timeout in seconds (1-60)
    #[arg(long, global = true, default_value = "10")]
    timeout: u64,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config =
        ServiceConfig::new(args.base_url.as_str()).with_timeout(Duration::from_secs(args.timeout));
    let repo = HttpRollRepository::new(&config)
        .with_context(|| format!("Invalid record service settings for {}", args.base_url))?;
    debug!("Record service: {}", repo.base_url());

    let workspace = Workspace {
        repo: Arc::new(repo),
        base_url: config.normalized_base_url().to_string(),
        output: Output { json: args.json },
    };

    commands::run(args.command, &workspace).await
}
