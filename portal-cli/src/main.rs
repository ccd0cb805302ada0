//! Provider portal optimistic-update demo.
//!
//! Runs a scripted patient-list session against an in-memory store and
//! prints the reconciled collection and any failed mutations as JSON.
//!
//! Usage:
//!   portal-demo --fail-next 2 --latency-ms 150

use anyhow::{Context, Result};
use clap::Parser;
use portal_cli::{SessionOptions, run_session};
use portal_optimistic::CoordinatorConfig;
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portal-demo")]
#[command(about = "Optimistic patient-list updates against an in-memory store")]
struct Args {
    /// Coordinator config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail this many remote calls after the initial load
    #[arg(long, default_value = "0")]
    fail_next: usize,

    /// Simulated latency per remote call, in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Keep speculative updates in place when the remote call fails
    #[arg(long)]
    no_revert: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if args.no_revert {
        config.revert_on_error = false;
    }
    info!(key_field = %config.key_field, revert = config.revert_on_error, "starting session");

    let opts = SessionOptions {
        fail_next: args.fail_next,
        latency: (args.latency_ms > 0).then(|| Duration::from_millis(args.latency_ms)),
    };
    let report = run_session(config, &opts).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
