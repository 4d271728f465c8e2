//! Record encode/decode for every channel.
//!
//! Text frames hold one record per line; decoders skip blank lines so a frame
//! may carry a trailing newline. The sensor feed is binary: a concatenation of
//! fixed-size records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skymon_core::{AircraftId, AircraftState, Vec3};

use crate::error::CodecError;

/// Serialized size of one [`SensorRecord`]: `u32` id, six `f64` components and
/// an `i64` start time, fixed little-endian layout.
pub const SENSOR_RECORD_LEN: usize = 60;

// ============================================================================
// aircraft-state channel
// ============================================================================

/// One `id posX posY posZ violationFlag` line on the aircraft-state channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub id: AircraftId,
    pub position: Vec3,
    pub violation: bool,
}

impl StateRecord {
    /// Read-only projection of a roster entry.
    pub fn from_state(state: &AircraftState) -> Self {
        Self {
            id: state.id,
            position: state.position,
            violation: state.violation,
        }
    }
}

pub fn encode_state_frame(records: &[StateRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "{} {:.2} {:.2} {:.2} {}\n",
            r.id,
            r.position.x,
            r.position.y,
            r.position.z,
            u8::from(r.violation),
        ));
    }
    out.into_bytes()
}

pub fn decode_state_frame(frame: &[u8]) -> Result<Vec<StateRecord>, CodecError> {
    text_lines(frame)?
        .map(|line| {
            let mut fields = Fields::new(line);
            let record = StateRecord {
                id: fields.u32("id")?,
                position: fields.vec3("pos")?,
                violation: fields.flag("violation")?,
            };
            Ok(record)
        })
        .collect()
}

// ============================================================================
// augmented-info channel
// ============================================================================

/// One `id posX posY posZ velX velY velZ` line on the augmented-info channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedRecord {
    pub id: AircraftId,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl AugmentedRecord {
    pub fn from_state(state: &AircraftState) -> Self {
        Self {
            id: state.id,
            position: state.position,
            velocity: state.velocity,
        }
    }
}

pub fn encode_augmented_frame(records: &[AugmentedRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "{} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}\n",
            r.id,
            r.position.x,
            r.position.y,
            r.position.z,
            r.velocity.x,
            r.velocity.y,
            r.velocity.z,
        ));
    }
    out.into_bytes()
}

pub fn decode_augmented_frame(frame: &[u8]) -> Result<Vec<AugmentedRecord>, CodecError> {
    text_lines(frame)?
        .map(|line| {
            let mut fields = Fields::new(line);
            let record = AugmentedRecord {
                id: fields.u32("id")?,
                position: fields.vec3("pos")?,
                velocity: fields.vec3("vel")?,
            };
            Ok(record)
        })
        .collect()
}

// ============================================================================
// alerts channel
// ============================================================================

/// One `ALERT: Time: <t>, Message: <text>` line on the alerts channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub time: f64,
    pub message: String,
}

const ALERT_TIME_PREFIX: &str = "ALERT: Time: ";
const ALERT_MESSAGE_SEPARATOR: &str = ", Message: ";

pub fn encode_alert_frame(records: &[AlertRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "{}{:.2}{}{}\n",
            ALERT_TIME_PREFIX, r.time, ALERT_MESSAGE_SEPARATOR, r.message
        ));
    }
    out.into_bytes()
}

/// Encodes one alert record as a single line, for capacity accounting.
pub fn encode_alert_line(record: &AlertRecord) -> String {
    format!(
        "{}{:.2}{}{}\n",
        ALERT_TIME_PREFIX, record.time, ALERT_MESSAGE_SEPARATOR, record.message
    )
}

pub fn decode_alert_frame(frame: &[u8]) -> Result<Vec<AlertRecord>, CodecError> {
    text_lines(frame)?
        .map(|line| {
            let rest = line
                .strip_prefix(ALERT_TIME_PREFIX)
                .ok_or_else(|| CodecError::MissingField {
                    field: "time",
                    line: line.to_string(),
                })?;
            let (time_text, message) = rest.split_once(ALERT_MESSAGE_SEPARATOR).ok_or_else(|| {
                CodecError::MissingField {
                    field: "message",
                    line: line.to_string(),
                }
            })?;
            let time = time_text
                .parse::<f64>()
                .map_err(|_| CodecError::InvalidNumber {
                    field: "time",
                    value: time_text.to_string(),
                })?;
            Ok(AlertRecord {
                time,
                message: message.to_string(),
            })
        })
        .collect()
}

// ============================================================================
// operator-commands channel
// ============================================================================

/// The operator's typed instruction payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Replace the velocity of one aircraft.
    SpeedChange { id: AircraftId, velocity: Vec3 },

    /// Publish augmented information for one aircraft.
    AugmentedInformation { id: AircraftId },
}

const SPEED_CHANGE_TOKEN: &str = "Speed_Change";
const AUGMENTED_INFORMATION_TOKEN: &str = "Augmented_Information";

/// One timestamped operator command; the channel carries a single in-flight
/// slot, so a frame holds exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCommand {
    pub issued_at: DateTime<Utc>,
    pub kind: CommandKind,
}

impl OperatorCommand {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            issued_at: Utc::now(),
            kind,
        }
    }
}

pub fn encode_operator_command(command: &OperatorCommand) -> Vec<u8> {
    let timestamp = command.issued_at.to_rfc3339();
    let line = match &command.kind {
        CommandKind::SpeedChange { id, velocity } => format!(
            "{timestamp} {SPEED_CHANGE_TOKEN} {id} {:.2} {:.2} {:.2}\n",
            velocity.x, velocity.y, velocity.z
        ),
        CommandKind::AugmentedInformation { id } => {
            format!("{timestamp} {AUGMENTED_INFORMATION_TOKEN} {id}\n")
        }
    };
    line.into_bytes()
}

/// Decodes the single command held by an operator-commands frame.
pub fn decode_operator_frame(frame: &[u8]) -> Result<OperatorCommand, CodecError> {
    let line = text_lines(frame)?.next().ok_or(CodecError::MissingField {
        field: "timestamp",
        line: String::new(),
    })?;

    let mut fields = Fields::new(line);
    let timestamp_text = fields.str("timestamp")?;
    let issued_at = DateTime::parse_from_rfc3339(timestamp_text)
        .map_err(|_| CodecError::InvalidTimestamp(timestamp_text.to_string()))?
        .with_timezone(&Utc);

    let kind_token = fields.str("command_type")?;
    let kind = match kind_token {
        SPEED_CHANGE_TOKEN => CommandKind::SpeedChange {
            id: fields.u32("id")?,
            velocity: fields.vec3("vel")?,
        },
        AUGMENTED_INFORMATION_TOKEN => CommandKind::AugmentedInformation {
            id: fields.u32("id")?,
        },
        other => return Err(CodecError::UnknownCommandType(other.to_string())),
    };

    Ok(OperatorCommand { issued_at, kind })
}

// ============================================================================
// relay-commands / sensor-commands channels
// ============================================================================

/// One `<aircraftID> <velX> <velY> <velZ>` line on a command relay channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayCommand {
    pub id: AircraftId,
    pub velocity: Vec3,
}

pub fn encode_relay_frame(records: &[RelayCommand]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "{} {:.2} {:.2} {:.2}\n",
            r.id, r.velocity.x, r.velocity.y, r.velocity.z
        ));
    }
    out.into_bytes()
}

pub fn decode_relay_frame(frame: &[u8]) -> Result<Vec<RelayCommand>, CodecError> {
    text_lines(frame)?
        .map(|line| {
            let mut fields = Fields::new(line);
            let record = RelayCommand {
                id: fields.u32("id")?,
                velocity: fields.vec3("vel")?,
            };
            Ok(record)
        })
        .collect()
}

// ============================================================================
// sensor-feed channel (binary)
// ============================================================================

/// One fixed-layout binary record on the sensor feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub id: AircraftId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub start_time: i64,
}

impl SensorRecord {
    /// Converts a feed record into a fresh roster entry.
    pub fn into_state(self) -> AircraftState {
        AircraftState::new(self.id, self.position, self.velocity, self.start_time)
    }
}

pub fn encode_sensor_frame(records: &[SensorRecord]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(records.len() * SENSOR_RECORD_LEN);
    for record in records {
        out.extend_from_slice(&bincode::serialize(record)?);
    }
    Ok(out)
}

pub fn decode_sensor_frame(frame: &[u8]) -> Result<Vec<SensorRecord>, CodecError> {
    if frame.len() % SENSOR_RECORD_LEN != 0 {
        return Err(CodecError::TruncatedBinaryRecord {
            len: frame.len(),
            record_len: SENSOR_RECORD_LEN,
        });
    }
    frame
        .chunks_exact(SENSOR_RECORD_LEN)
        .map(|chunk| bincode::deserialize(chunk).map_err(CodecError::from))
        .collect()
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Non-empty trimmed lines of a UTF-8 frame.
fn text_lines(frame: &[u8]) -> Result<impl Iterator<Item = &str>, CodecError> {
    let text = std::str::from_utf8(frame)?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()))
}

/// Whitespace-separated field cursor over one record line.
struct Fields<'a> {
    line: &'a str,
    parts: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            parts: line.split_whitespace(),
        }
    }

    fn str(&mut self, field: &'static str) -> Result<&'a str, CodecError> {
        self.parts.next().ok_or_else(|| CodecError::MissingField {
            field,
            line: self.line.to_string(),
        })
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        let value = self.str(field)?;
        value.parse().map_err(|_| CodecError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    fn f64(&mut self, field: &'static str) -> Result<f64, CodecError> {
        let value = self.str(field)?;
        value.parse().map_err(|_| CodecError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }

    fn vec3(&mut self, field: &'static str) -> Result<Vec3, CodecError> {
        Ok(Vec3::new(self.f64(field)?, self.f64(field)?, self.f64(field)?))
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.str(field)? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(CodecError::InvalidNumber {
                field,
                value: other.to_string(),
            }),
        }
    }
}
