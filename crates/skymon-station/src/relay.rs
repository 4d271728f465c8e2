//! The relay process: forwards command frames from the analysis process to
//! the sensor.
//!
//! Both hops are single-slot, last-write-wins channels. The relay consumes
//! the inbound slot, validates the records by decoding them and re-encodes
//! onto the sensor hop - a malformed frame is dropped with a log line rather
//! than passed through.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skymon_core::{config::PROCESS_RELAY, MonitorConfig};
use skymon_ipc::{
    destroy_all, open_channel, spawn_periodic, Channel, ChannelError, ChannelKind,
    TerminationCoordinator,
};
use skymon_protocol::{decode_relay_frame, encode_relay_frame};

/// The relay's two channels.
pub struct Relay {
    inbound: Channel,
    outbound: Channel,
}

impl Relay {
    pub fn open(config: &MonitorConfig) -> Result<Self, ChannelError> {
        let inbound = open_channel(
            &config.namespace,
            ChannelKind::RelayCommands,
            config.max_aircraft,
        )?;
        let outbound = open_channel(
            &config.namespace,
            ChannelKind::SensorCommands,
            config.max_aircraft,
        )?;
        info!(namespace = %config.namespace, "relay channels open");
        Ok(Self { inbound, outbound })
    }

    /// Forwards one pending command frame, if any.
    pub fn forward(&self) -> Result<(), ChannelError> {
        let frame = match self.inbound.take_frame() {
            Ok(frame) => frame,
            Err(ChannelError::StaleOrEmptyFrame) => return Ok(()),
            Err(e) => return Err(e),
        };

        let commands = decode_relay_frame(&frame.payload)?;
        if commands.is_empty() {
            return Ok(());
        }

        self.outbound.write_frame(&encode_relay_frame(&commands))?;
        debug!(commands = commands.len(), "commands forwarded to sensor");
        Ok(())
    }
}

/// Runs the relay process until shutdown completes.
pub async fn run(config: MonitorConfig, cancel: CancellationToken) -> Result<(), ChannelError> {
    let mut coordinator = TerminationCoordinator::open(&config, PROCESS_RELAY)?;
    let relay = std::sync::Arc::new(Relay::open(&config)?);

    let forward = std::sync::Arc::clone(&relay);
    let handle = spawn_periodic(
        "relay-forward",
        config.periods.relay_forward(),
        cancel.clone(),
        move || forward.forward(),
    );
    info!("relay running");

    let trigger = coordinator.await_trigger(&cancel).await;
    cancel.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "relay task did not shut down cleanly");
    }

    let teardown_owner = coordinator.complete(trigger).await?;
    drop(relay);
    if teardown_owner {
        destroy_all(&config.namespace, config.max_aircraft)?;
        info!(namespace = %config.namespace, "shared regions removed");
    }

    info!("relay terminated");
    Ok(())
}
