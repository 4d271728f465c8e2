//! Skymon Clear - removes every named shared-memory region of a namespace.
//!
//! For recovering after an aborted run that left regions behind; a clean
//! termination handshake removes them itself.
//!
//! # Usage
//!
//! ```bash
//! skymon-clear
//! skymon-clear -c /etc/skymon.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skymon_core::MonitorConfig;
use skymon_ipc::destroy_all;

/// Skymon shared-memory cleanup tool
#[derive(Parser, Debug)]
#[command(name = "skymon-clear", version, about)]
struct Args {
    /// Path to the monitor configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skymon_ipc=info".parse()?))
        .init();

    let config = MonitorConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    destroy_all(&config.namespace, config.max_aircraft)
        .context("Failed to remove shared regions")?;

    println!(
        "All shared regions of namespace '{}' have been removed.",
        config.namespace
    );
    Ok(())
}
