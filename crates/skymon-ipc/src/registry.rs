//! The fixed table of channels shared by every process.
//!
//! Each channel has a well-known name suffix, a capacity and a record format
//! (owned by `skymon-protocol`). All processes open channels through this
//! table so capacities always agree; names carry a configurable namespace
//! prefix so test deployments never collide with a live one.

use skymon_protocol::SENSOR_RECORD_LEN;
use tracing::info;

use crate::channel::Channel;
use crate::error::ChannelError;

/// Headroom added to record-sized capacities: the write contract rejects a
/// frame whose size equals the capacity, so a full record set needs slack to
/// stay under the strict bound.
const FRAME_SLACK: usize = 64;

/// Reserved bytes per text relay-command record.
const RELAY_RECORD_RESERVE: usize = 64;

/// Every channel of the monitoring network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Analysis → Display: `id posX posY posZ violationFlag` lines.
    AircraftState,
    /// Analysis → Display, on demand: position and velocity lines.
    AugmentedInfo,
    /// Analysis → Display: alert lines in flush order.
    Alerts,
    /// Operator → Analysis: single in-flight command slot.
    OperatorCommands,
    /// Analysis → Relay: single in-flight speed-change slot.
    RelayCommands,
    /// Relay → Sensor: single in-flight speed-change slot.
    SensorCommands,
    /// Sensor → Analysis: fixed binary aircraft records.
    SensorFeed,
    /// Any → all: termination request and acknowledgments.
    Termination,
}

impl ChannelKind {
    /// All channels, in teardown order.
    pub const ALL: [ChannelKind; 8] = [
        ChannelKind::AircraftState,
        ChannelKind::AugmentedInfo,
        ChannelKind::Alerts,
        ChannelKind::OperatorCommands,
        ChannelKind::RelayCommands,
        ChannelKind::SensorCommands,
        ChannelKind::SensorFeed,
        ChannelKind::Termination,
    ];

    /// The name suffix appended to the deployment namespace.
    pub fn suffix(&self) -> &'static str {
        match self {
            ChannelKind::AircraftState => "aircraft-state",
            ChannelKind::AugmentedInfo => "augmented-info",
            ChannelKind::Alerts => "alerts",
            ChannelKind::OperatorCommands => "operator-commands",
            ChannelKind::RelayCommands => "relay-commands",
            ChannelKind::SensorCommands => "sensor-commands",
            ChannelKind::SensorFeed => "sensor-feed",
            ChannelKind::Termination => "termination",
        }
    }

    /// Fixed capacity in bytes. The binary and relay channels scale with the
    /// maximum aircraft count; everything else is constant.
    pub fn capacity(&self, max_aircraft: usize) -> usize {
        match self {
            ChannelKind::AircraftState => 2048,
            ChannelKind::AugmentedInfo => 4096,
            ChannelKind::Alerts => 4096,
            ChannelKind::OperatorCommands => 4096,
            ChannelKind::RelayCommands | ChannelKind::SensorCommands => {
                RELAY_RECORD_RESERVE * max_aircraft + FRAME_SLACK
            }
            ChannelKind::SensorFeed => SENSOR_RECORD_LEN * max_aircraft + FRAME_SLACK,
            ChannelKind::Termination => 4096,
        }
    }
}

/// Full OS-level name of a channel within a namespace.
pub fn channel_name(namespace: &str, kind: ChannelKind) -> String {
    format!("{namespace}-{}", kind.suffix())
}

/// Opens (creates or attaches) one channel of a deployment.
pub fn open_channel(
    namespace: &str,
    kind: ChannelKind,
    max_aircraft: usize,
) -> Result<Channel, ChannelError> {
    Channel::open(&channel_name(namespace, kind), kind.capacity(max_aircraft))
}

/// Force-removes every named region of a namespace.
///
/// Used by the teardown owner after the termination handshake completes, and
/// by the maintenance tool after an aborted run. Regions that do not exist
/// are skipped.
pub fn destroy_all(namespace: &str, max_aircraft: usize) -> Result<(), ChannelError> {
    for kind in ChannelKind::ALL {
        match open_channel(namespace, kind, max_aircraft) {
            Ok(channel) => {
                info!(channel = %channel.name(), "destroying channel");
                channel.destroy();
            }
            Err(ChannelError::OpenFailure { .. }) => {
                // Nothing to remove.
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
