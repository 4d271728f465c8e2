//! Skymon Display - renders aircraft state, augmented information and alerts.
//!
//! # Usage
//!
//! ```bash
//! skymon-display
//! skymon-display -c /etc/skymon.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skymon_core::MonitorConfig;
use skymon_station::display;

/// Skymon display process
#[derive(Parser, Debug)]
#[command(name = "skymon-display", version, about)]
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
        "display starting"
    );

    let cancel = CancellationToken::new();
    let shutdown_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown_token.cancel();
        }
    });

    if let Err(e) = display::run(config, cancel).await {
        error!(error = %e, "Display process error");
        return Err(e.into());
    }

    Ok(())
}
