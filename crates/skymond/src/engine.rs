//! The analysis engine and its periodic tasks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use skymon_core::{
    assess_pair, Alert, AircraftId, ConflictAssessment, MonitorConfig,
};
use skymon_ipc::{open_channel, spawn_periodic, Channel, ChannelError, ChannelKind};
use skymon_protocol::{
    decode_operator_frame, decode_sensor_frame, encode_alert_line, encode_augmented_frame,
    encode_relay_frame, encode_state_frame, AlertRecord, AugmentedRecord, CommandKind,
    RelayCommand, StateRecord,
};

use crate::state::MonitorState;

/// Every channel the analysis process touches, opened once at startup.
///
/// Opening is all-or-nothing: any failure here is fatal to the process.
struct EngineChannels {
    feed: Channel,
    state_out: Channel,
    augmented_out: Channel,
    alerts_out: Channel,
    operator_in: Channel,
    relay_out: Channel,
}

impl EngineChannels {
    fn open(config: &MonitorConfig) -> Result<Self, ChannelError> {
        let ns = &config.namespace;
        let n = config.max_aircraft;
        Ok(Self {
            feed: open_channel(ns, ChannelKind::SensorFeed, n)?,
            state_out: open_channel(ns, ChannelKind::AircraftState, n)?,
            augmented_out: open_channel(ns, ChannelKind::AugmentedInfo, n)?,
            alerts_out: open_channel(ns, ChannelKind::Alerts, n)?,
            operator_in: open_channel(ns, ChannelKind::OperatorCommands, n)?,
            relay_out: open_channel(ns, ChannelKind::RelayCommands, n)?,
        })
    }
}

/// The monitoring engine: owns the channels and the shared state, and exposes
/// one method per periodic task.
pub struct AnalysisEngine {
    config: MonitorConfig,
    channels: EngineChannels,
    state: MonitorState,
}

impl AnalysisEngine {
    /// Opens every channel of the configured namespace.
    pub fn open(config: MonitorConfig) -> Result<Self, ChannelError> {
        let channels = EngineChannels::open(&config)?;
        info!(namespace = %config.namespace, "analysis channels open");
        Ok(Self {
            config,
            channels,
            state: MonitorState::new(),
        })
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Roster refresh: replaces the whole roster from the latest feed frame.
    ///
    /// An empty or stale frame skips the cycle - the previous roster stays
    /// authoritative until the sensor publishes again.
    pub fn refresh_roster(&self) -> Result<(), ChannelError> {
        let frame = match self.channels.feed.read_frame() {
            Ok(frame) => frame,
            Err(ChannelError::StaleOrEmptyFrame) => {
                debug!("sensor feed empty, skipping roster refresh");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let records = decode_sensor_frame(&frame.payload)?;
        let count = records.len();

        let mut roster = self.state.lock_roster();
        roster.replace_all(records.into_iter().map(|r| r.into_state()).collect());
        drop(roster);

        debug!(aircraft = count, feed_version = frame.version, "roster refreshed");
        Ok(())
    }

    /// Conflict scan: assesses every unordered aircraft pair, O(n^2), updates
    /// the violation flags in place and pushes alerts.
    ///
    /// Priority policy per pair: a current violation wins; otherwise a
    /// predicted conflict within the horizon; otherwise a longer-range
    /// advisory. Violation flags are set for current and predicted conflicts,
    /// not for advisories.
    pub fn scan_conflicts(&self) -> Result<(), ChannelError> {
        // Roster first, alerts second - the fixed lock order.
        let mut roster = self.state.lock_roster();
        let snapshot = roster.snapshot();

        let mut assessments: Vec<(AircraftId, AircraftId, ConflictAssessment)> = Vec::new();
        for (i, a) in snapshot.iter().enumerate() {
            for b in snapshot.iter().skip(i + 1) {
                let assessment =
                    assess_pair(a, b, &self.config.separation, &self.config.prediction);
                if assessment != ConflictAssessment::Clear {
                    assessments.push((a.id, b.id, assessment));
                }
            }
        }

        roster.clear_violations();
        let mut alerts = self.state.lock_alerts();
        for (a, b, assessment) in assessments {
            match assessment {
                ConflictAssessment::Violation => {
                    roster.mark_violation(a);
                    roster.mark_violation(b);
                    alerts.push(Alert::violation(a, b));
                }
                ConflictAssessment::Predicted(t) => {
                    roster.mark_violation(a);
                    roster.mark_violation(b);
                    alerts.push(Alert::predicted(t, a, b));
                }
                ConflictAssessment::Advisory(t) => {
                    alerts.push(Alert::advisory(t, a, b));
                }
                ConflictAssessment::Clear => {}
            }
        }

        if !alerts.is_empty() {
            debug!(pending = alerts.len(), "conflict scan pushed alerts");
        }
        Ok(())
    }

    /// Alert flush: drains the heap in priority order into the alerts channel.
    ///
    /// Encodes record by record; when the next record would exceed the channel
    /// capacity the flush stops there, reports the capacity error and drops
    /// the remainder rather than overflowing.
    pub fn flush_alerts(&self) -> Result<(), ChannelError> {
        let drained = self.state.lock_alerts().drain_ordered();
        if drained.is_empty() {
            return Ok(());
        }

        let capacity = self.channels.alerts_out.capacity();
        let mut encoded: Vec<u8> = Vec::new();
        let mut written = 0usize;
        for alert in &drained {
            let line = encode_alert_line(&AlertRecord {
                time: alert.time,
                message: alert.message.clone(),
            });
            if encoded.len() + line.len() >= capacity {
                warn!(
                    written,
                    dropped = drained.len() - written,
                    capacity,
                    "alerts channel at capacity, dropping lowest-priority alerts"
                );
                break;
            }
            encoded.extend_from_slice(line.as_bytes());
            written += 1;
        }

        if encoded.is_empty() {
            return Ok(());
        }
        let version = self.channels.alerts_out.write_frame(&encoded)?;
        debug!(alerts = written, version, "alerts flushed");
        Ok(())
    }

    /// State publish: writes the read-only roster projection to the
    /// aircraft-state channel.
    pub fn publish_state(&self) -> Result<(), ChannelError> {
        let snapshot = self.state.lock_roster().snapshot();
        if snapshot.is_empty() {
            debug!("roster empty, skipping state publish");
            return Ok(());
        }

        let records: Vec<StateRecord> = snapshot.iter().map(StateRecord::from_state).collect();
        let version = self.channels.state_out.write_frame(&encode_state_frame(&records))?;
        debug!(aircraft = records.len(), version, "aircraft state published");
        Ok(())
    }

    /// Command handling: consumes the operator slot and dispatches.
    ///
    /// Speed changes are re-encoded for the relay; augmented-information
    /// requests publish position and velocity on demand.
    pub fn handle_commands(&self) -> Result<(), ChannelError> {
        let frame = match self.channels.operator_in.take_frame() {
            Ok(frame) => frame,
            Err(ChannelError::StaleOrEmptyFrame) => return Ok(()),
            Err(e) => return Err(e),
        };

        let command = decode_operator_frame(&frame.payload)?;
        match command.kind {
            CommandKind::SpeedChange { id, velocity } => {
                if !self.state.lock_roster().contains(id) {
                    // The aircraft may simply not have reached the roster yet;
                    // the sensor matches by ID either way.
                    debug!(id, "speed change for aircraft not in roster, forwarding anyway");
                }
                let record = RelayCommand { id, velocity };
                self.channels
                    .relay_out
                    .write_frame(&encode_relay_frame(&[record]))?;
                info!(id, ?velocity, issued_at = %command.issued_at, "speed change relayed");
            }
            CommandKind::AugmentedInformation { id } => {
                let snapshot = self.state.lock_roster().snapshot();
                let records: Vec<AugmentedRecord> = snapshot
                    .iter()
                    .filter(|s| s.id == id)
                    .map(AugmentedRecord::from_state)
                    .collect();
                // An unknown ID publishes the whole roster rather than nothing,
                // matching the operator's "show me more" intent.
                let records = if records.is_empty() {
                    debug!(id, "augmented request for unknown aircraft, publishing all");
                    snapshot.iter().map(AugmentedRecord::from_state).collect()
                } else {
                    records
                };
                if records.is_empty() {
                    return Ok(());
                }
                self.channels
                    .augmented_out
                    .write_frame(&encode_augmented_frame(&records))?;
                info!(id, records = records.len(), "augmented information published");
            }
        }
        Ok(())
    }

    /// Spawns every periodic task of the analysis process.
    pub fn spawn_tasks(self: &Arc<Self>, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let periods = &self.config.periods;

        let refresh = Arc::clone(self);
        let scan = Arc::clone(self);
        let flush = Arc::clone(self);
        let publish = Arc::clone(self);
        let commands = Arc::clone(self);

        vec![
            spawn_periodic(
                "roster-refresh",
                periods.roster_refresh(),
                cancel.clone(),
                move || refresh.refresh_roster(),
            ),
            spawn_periodic(
                "conflict-scan",
                periods.conflict_scan(),
                cancel.clone(),
                move || scan.scan_conflicts(),
            ),
            spawn_periodic(
                "alert-flush",
                periods.alert_flush(),
                cancel.clone(),
                move || flush.flush_alerts(),
            ),
            spawn_periodic(
                "state-publish",
                periods.state_publish(),
                cancel.clone(),
                move || publish.publish_state(),
            ),
            spawn_periodic(
                "command-poll",
                periods.command_poll(),
                cancel.clone(),
                move || commands.handle_commands(),
            ),
        ]
    }
}
