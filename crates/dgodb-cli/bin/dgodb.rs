//! dgodb binary entry point.
//!
//! This is a thin wrapper around the dgodb-cli library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Builds the database and writes the requested outputs

use anyhow::{Context, Result};
use dgodb_cli::CliConfig;

fn main() -> Result<()> {
    let config = CliConfig::from_args();

    // Initialize tracing subscriber for logging
    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("dgodb starting with {} archives", config.archives.len());

    let stats = dgodb_cli::run(&config).context("failed to build object file database")?;

    tracing::info!(
        "Done: {} unique of {} objects ({:.1}% duplicates)",
        stats.unique_objects,
        stats.total_objects,
        stats.duplicate_ratio() * 100.0
    );

    Ok(())
}
