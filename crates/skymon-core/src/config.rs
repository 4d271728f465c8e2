//! Monitor configuration.
//!
//! Every task period, threshold, horizon, poll interval, the peer-name set and
//! the channel namespace live here rather than as literals, so deployments and
//! tests can tune them through a TOML file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Well-known process names, as written to the termination channel.
pub const PROCESS_SENSOR: &str = "sensor";
pub const PROCESS_ANALYSIS: &str = "analysis";
pub const PROCESS_OPERATOR: &str = "operator";
pub const PROCESS_RELAY: &str = "relay";
pub const PROCESS_DISPLAY: &str = "display";

/// Minimum separation thresholds for the axis-box violation test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Separation {
    /// Horizontal threshold per axis, in feet.
    #[serde(default = "default_horizontal_ft")]
    pub horizontal_ft: f64,

    /// Vertical threshold, in feet.
    #[serde(default = "default_vertical_ft")]
    pub vertical_ft: f64,
}

fn default_horizontal_ft() -> f64 {
    3000.0
}

fn default_vertical_ft() -> f64 {
    1000.0
}

impl Default for Separation {
    fn default() -> Self {
        Self {
            horizontal_ft: default_horizontal_ft(),
            vertical_ft: default_vertical_ft(),
        }
    }
}

/// Look-ahead windows for conflict prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Maximum look-ahead for a predicted conflict, in seconds.
    #[serde(default = "default_horizon_secs")]
    pub horizon_secs: f64,

    /// Extended window for longer-range advisories, in seconds.
    #[serde(default = "default_advisory_horizon_secs")]
    pub advisory_horizon_secs: f64,
}

fn default_horizon_secs() -> f64 {
    120.0
}

fn default_advisory_horizon_secs() -> f64 {
    240.0
}

impl Default for Prediction {
    fn default() -> Self {
        Self {
            horizon_secs: default_horizon_secs(),
            advisory_horizon_secs: default_advisory_horizon_secs(),
        }
    }
}

/// Periods of every perpetual task, in milliseconds.
///
/// Milliseconds rather than seconds so tests can run the loops at a fast
/// cadence without touching the production defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskPeriods {
    #[serde(default = "default_sensor_update_ms")]
    pub sensor_update_ms: u64,

    #[serde(default = "default_roster_refresh_ms")]
    pub roster_refresh_ms: u64,

    #[serde(default = "default_conflict_scan_ms")]
    pub conflict_scan_ms: u64,

    #[serde(default = "default_alert_flush_ms")]
    pub alert_flush_ms: u64,

    #[serde(default = "default_state_publish_ms")]
    pub state_publish_ms: u64,

    #[serde(default = "default_command_poll_ms")]
    pub command_poll_ms: u64,

    #[serde(default = "default_relay_forward_ms")]
    pub relay_forward_ms: u64,

    #[serde(default = "default_display_render_ms")]
    pub display_render_ms: u64,

    #[serde(default = "default_termination_poll_ms")]
    pub termination_poll_ms: u64,
}

fn default_sensor_update_ms() -> u64 {
    1_000
}

fn default_roster_refresh_ms() -> u64 {
    5_000
}

fn default_conflict_scan_ms() -> u64 {
    3_000
}

fn default_alert_flush_ms() -> u64 {
    5_000
}

fn default_state_publish_ms() -> u64 {
    5_000
}

fn default_command_poll_ms() -> u64 {
    1_000
}

fn default_relay_forward_ms() -> u64 {
    1_000
}

fn default_display_render_ms() -> u64 {
    5_000
}

fn default_termination_poll_ms() -> u64 {
    2_000
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self {
            sensor_update_ms: default_sensor_update_ms(),
            roster_refresh_ms: default_roster_refresh_ms(),
            conflict_scan_ms: default_conflict_scan_ms(),
            alert_flush_ms: default_alert_flush_ms(),
            state_publish_ms: default_state_publish_ms(),
            command_poll_ms: default_command_poll_ms(),
            relay_forward_ms: default_relay_forward_ms(),
            display_render_ms: default_display_render_ms(),
            termination_poll_ms: default_termination_poll_ms(),
        }
    }
}

impl TaskPeriods {
    pub fn sensor_update(&self) -> Duration {
        Duration::from_millis(self.sensor_update_ms)
    }

    pub fn roster_refresh(&self) -> Duration {
        Duration::from_millis(self.roster_refresh_ms)
    }

    pub fn conflict_scan(&self) -> Duration {
        Duration::from_millis(self.conflict_scan_ms)
    }

    pub fn alert_flush(&self) -> Duration {
        Duration::from_millis(self.alert_flush_ms)
    }

    pub fn state_publish(&self) -> Duration {
        Duration::from_millis(self.state_publish_ms)
    }

    pub fn command_poll(&self) -> Duration {
        Duration::from_millis(self.command_poll_ms)
    }

    pub fn relay_forward(&self) -> Duration {
        Duration::from_millis(self.relay_forward_ms)
    }

    pub fn display_render(&self) -> Duration {
        Duration::from_millis(self.display_render_ms)
    }

    pub fn termination_poll(&self) -> Duration {
        Duration::from_millis(self.termination_poll_ms)
    }
}

/// Top-level configuration shared by every process of one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Prefix of every named shared-memory region. Distinct namespaces give
    /// fully isolated deployments on the same host.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Maximum aircraft carried by the sensor feed; sizes the binary channels.
    #[serde(default = "default_max_aircraft")]
    pub max_aircraft: usize,

    /// Every process name expected to acknowledge termination.
    #[serde(default = "default_peers")]
    pub peers: Vec<String>,

    #[serde(default)]
    pub separation: Separation,

    #[serde(default)]
    pub prediction: Prediction,

    #[serde(default)]
    pub periods: TaskPeriods,
}

fn default_namespace() -> String {
    "skymon".to_string()
}

fn default_max_aircraft() -> usize {
    20
}

fn default_peers() -> Vec<String> {
    vec![
        PROCESS_SENSOR.to_string(),
        PROCESS_ANALYSIS.to_string(),
        PROCESS_OPERATOR.to_string(),
        PROCESS_RELAY.to_string(),
        PROCESS_DISPLAY.to_string(),
    ]
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_aircraft: default_max_aircraft(),
            peers: default_peers(),
            separation: Separation::default(),
            prediction: Prediction::default(),
            periods: TaskPeriods::default(),
        }
    }
}

impl MonitorConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads from `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.namespace, "skymon");
        assert_eq!(config.max_aircraft, 20);
        assert_eq!(config.peers.len(), 5);
        assert_eq!(config.separation.horizontal_ft, 3000.0);
        assert_eq!(config.separation.vertical_ft, 1000.0);
        assert_eq!(config.prediction.horizon_secs, 120.0);
        assert_eq!(config.periods.conflict_scan(), Duration::from_secs(3));
        assert_eq!(config.periods.roster_refresh(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
namespace = "skymon-test"

[periods]
conflict_scan_ms = 250
"#
        )
        .expect("write config");

        let config = MonitorConfig::load(file.path()).expect("load config");
        assert_eq!(config.namespace, "skymon-test");
        assert_eq!(config.periods.conflict_scan_ms, 250);
        // Untouched sections keep their defaults.
        assert_eq!(config.periods.roster_refresh_ms, 5_000);
        assert_eq!(config.separation, Separation::default());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = MonitorConfig::load(Path::new("/nonexistent/skymon.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = MonitorConfig::load_or_default(None).expect("defaults");
        assert_eq!(config, MonitorConfig::default());
    }
}
