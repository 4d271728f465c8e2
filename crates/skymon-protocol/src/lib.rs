//! Skymon Protocol - record formats for every shared channel.
//!
//! A channel frame is an opaque byte region; this crate turns frames into
//! typed records and back. Every record type has an explicit encode/decode
//! pair returning a typed result - malformed input is rejected, never
//! silently truncated.
//!
//! Text channels carry UTF-8 lines; the sensor feed carries fixed-size binary
//! records.

pub mod error;
pub mod record;
pub mod termination;

// Re-exports for convenience
pub use error::CodecError;
pub use record::{
    decode_alert_frame, decode_augmented_frame, decode_operator_frame, decode_relay_frame,
    decode_sensor_frame, decode_state_frame, encode_alert_frame, encode_alert_line,
    encode_augmented_frame, encode_operator_command, encode_relay_frame, encode_sensor_frame,
    encode_state_frame,
    AlertRecord, AugmentedRecord, CommandKind, OperatorCommand, RelayCommand, SensorRecord,
    StateRecord, SENSOR_RECORD_LEN,
};
pub use termination::{TerminationLedger, ACK_PREFIX, TERMINATE_REQUEST};
