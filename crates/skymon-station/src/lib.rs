//! Skymon Station - the peripheral processes of the monitoring network.
//!
//! Each module is one independently started process built from the same
//! pieces: channels from `skymon-ipc`, records from `skymon-protocol`, the
//! periodic task driver and the termination coordinator.
//!
//! - `sensor` - owns the live tracks, advances them every second, publishes
//!   the binary feed and applies relayed speed changes
//! - `relay` - forwards command frames from the analysis process to the sensor
//! - `display` - renders aircraft state, augmented info and alerts as lines
//! - `operator` - turns command lines into operator-command records and can
//!   initiate termination

pub mod display;
pub mod operator;
pub mod relay;
pub mod sensor;

pub use display::Display;
pub use operator::{parse_line, Operator, OperatorAction};
pub use relay::Relay;
pub use sensor::{default_scenario, Sensor};
