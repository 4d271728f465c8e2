//! Skymon Sensor - the radar-side process.
//!
//! Advances the live tracks every second, publishes the binary sensor feed
//! and applies relayed speed changes.
//!
//! # Usage
//!
//! ```bash
//! skymon-sensor
//! skymon-sensor -c /etc/skymon.toml
//! RUST_LOG=skymon_station=debug skymon-sensor
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skymon_core::MonitorConfig;
use skymon_station::sensor;

/// Skymon sensor process
#[derive(Parser, Debug)]
#[command(name = "skymon-sensor", version, about)]
struct Args {
    /// Path to the monitor configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("skymon_station=info".parse()?)
                .add_directive("skymon_ipc=info".parse()?),
        )
        .init();

    let config = MonitorConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = %config.namespace,
        "sensor starting"
    );

    let cancel = CancellationToken::new();
    let shutdown_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown_token.cancel();
        }
    });

    if let Err(e) = sensor::run(config, cancel, sensor::default_scenario()).await {
        error!(error = %e, "Sensor process error");
        return Err(e.into());
    }

    Ok(())
}
