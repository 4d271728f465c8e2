//! The display process: renders aircraft state, augmented information and
//! alerts as text lines.
//!
//! A thin consumer over three read-only channels. Frames already rendered are
//! skipped by comparing version counters, so an unchanged channel costs one
//! locked read and nothing else. The three reads are independent - they may
//! reflect different publish cycles, which is accepted, not fixed.

use std::io::Write;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use skymon_core::{config::PROCESS_DISPLAY, MonitorConfig};
use skymon_ipc::{
    destroy_all, open_channel, spawn_periodic, Channel, ChannelError, ChannelKind,
    TerminationCoordinator,
};
use skymon_protocol::{decode_alert_frame, decode_augmented_frame, decode_state_frame};

#[derive(Debug, Default, Clone, Copy)]
struct SeenVersions {
    state: u64,
    augmented: u64,
    alerts: u64,
}

/// The display process state: three inbound channels plus the last rendered
/// version of each.
pub struct Display {
    state_in: Channel,
    augmented_in: Channel,
    alerts_in: Channel,
    seen: Mutex<SeenVersions>,
}

impl Display {
    pub fn open(config: &MonitorConfig) -> Result<Self, ChannelError> {
        let ns = &config.namespace;
        let n = config.max_aircraft;
        info!(namespace = %ns, "display channels open");
        Ok(Self {
            state_in: open_channel(ns, ChannelKind::AircraftState, n)?,
            augmented_in: open_channel(ns, ChannelKind::AugmentedInfo, n)?,
            alerts_in: open_channel(ns, ChannelKind::Alerts, n)?,
            seen: Mutex::new(SeenVersions::default()),
        })
    }

    /// Renders everything new since the previous cycle into `out`.
    ///
    /// Channel errors are logged and that channel is skipped for the cycle -
    /// "nothing yet" is normal while producers start up.
    pub fn render(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let mut seen = self
            .seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(frame) = Self::fresh_frame(&self.state_in, seen.state) {
            seen.state = frame.version;
            match decode_state_frame(&frame.payload) {
                Ok(records) => {
                    for r in &records {
                        let marker = if r.violation { "  [VIOLATION]" } else { "" };
                        writeln!(
                            out,
                            "AIRCRAFT {} ({:.2}, {:.2}, {:.2}){}",
                            r.id, r.position.x, r.position.y, r.position.z, marker
                        )?;
                    }
                }
                Err(e) => warn!(error = %e, "malformed aircraft-state frame skipped"),
            }
        }

        if let Some(frame) = Self::fresh_frame(&self.augmented_in, seen.augmented) {
            seen.augmented = frame.version;
            match decode_augmented_frame(&frame.payload) {
                Ok(records) => {
                    for r in &records {
                        writeln!(
                            out,
                            "AUGMENTED {} pos ({:.2}, {:.2}, {:.2}) vel ({:.2}, {:.2}, {:.2})",
                            r.id,
                            r.position.x,
                            r.position.y,
                            r.position.z,
                            r.velocity.x,
                            r.velocity.y,
                            r.velocity.z
                        )?;
                    }
                }
                Err(e) => warn!(error = %e, "malformed augmented-info frame skipped"),
            }
        }

        if let Some(frame) = Self::fresh_frame(&self.alerts_in, seen.alerts) {
            seen.alerts = frame.version;
            match decode_alert_frame(&frame.payload) {
                Ok(records) => {
                    for r in &records {
                        writeln!(out, "ALERT: Time: {:.2}, Message: {}", r.time, r.message)?;
                    }
                }
                Err(e) => warn!(error = %e, "malformed alerts frame skipped"),
            }
        }

        Ok(())
    }

    /// Reads a channel, returning the frame only when it is newer than what
    /// was already rendered.
    fn fresh_frame(channel: &Channel, seen: u64) -> Option<skymon_ipc::Frame> {
        match channel.read_frame() {
            Ok(frame) if frame.version != seen => Some(frame),
            Ok(_) => None,
            Err(ChannelError::StaleOrEmptyFrame) => None,
            Err(e) => {
                warn!(channel = channel.name(), error = %e, "display read failed");
                None
            }
        }
    }
}

/// Runs the display process until shutdown completes, rendering to stdout.
pub async fn run(config: MonitorConfig, cancel: CancellationToken) -> Result<(), ChannelError> {
    let mut coordinator = TerminationCoordinator::open(&config, PROCESS_DISPLAY)?;
    let display = std::sync::Arc::new(Display::open(&config)?);

    let render = std::sync::Arc::clone(&display);
    let handle = spawn_periodic(
        "display-render",
        config.periods.display_render(),
        cancel.clone(),
        move || {
            let mut stdout = std::io::stdout().lock();
            render.render(&mut stdout)
        },
    );
    info!("display running");

    let trigger = coordinator.await_trigger(&cancel).await;
    cancel.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "display task did not shut down cleanly");
    }

    let teardown_owner = coordinator.complete(trigger).await?;
    drop(display);
    if teardown_owner {
        destroy_all(&config.namespace, config.max_aircraft)?;
        info!(namespace = %config.namespace, "shared regions removed");
    }

    info!("display terminated");
    Ok(())
}
