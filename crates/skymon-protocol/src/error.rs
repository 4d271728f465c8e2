//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding or decoding channel records.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A text frame was not valid UTF-8.
    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A record line ended before a required field.
    #[error("Record is missing field '{field}': {line}")]
    MissingField { field: &'static str, line: String },

    /// A field failed numeric parsing.
    #[error("Invalid number in field '{field}': {value}")]
    InvalidNumber { field: &'static str, value: String },

    /// An operator command carried an unknown command type token.
    #[error("Unknown command type: {0}")]
    UnknownCommandType(String),

    /// An operator command timestamp was not RFC 3339.
    #[error("Invalid command timestamp: {0}")]
    InvalidTimestamp(String),

    /// A binary frame length is not a whole number of records.
    #[error("Binary frame of {len} bytes is not a multiple of the {record_len}-byte record")]
    TruncatedBinaryRecord { len: usize, record_len: usize },

    /// The binary record serializer failed.
    #[error("Binary record codec failed: {0}")]
    Binary(#[from] bincode::Error),
}
