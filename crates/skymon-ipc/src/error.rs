//! Channel error taxonomy.

use skymon_protocol::CodecError;
use thiserror::Error;

/// Errors raised by the shared-channel layer.
///
/// `OpenFailure` is fatal to the calling process; `FrameTooLarge` and
/// `StaleOrEmptyFrame` are steady-state conditions the caller logs and skips.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The named region or its lock could not be created or attached.
    #[error("Failed to open channel '{name}': {reason}")]
    OpenFailure { name: String, reason: String },

    /// An existing region is too small for the requested capacity.
    #[error("Shared region '{name}' holds {usable} usable bytes, capacity {capacity} required")]
    RegionTooSmall {
        name: String,
        usable: usize,
        capacity: usize,
    },

    /// A write was rejected because the frame would not fit; the prior frame
    /// is untouched.
    #[error("Frame of {len} bytes exceeds channel capacity {capacity}")]
    FrameTooLarge { len: usize, capacity: usize },

    /// A read found no usable frame; the caller treats this as "nothing yet".
    #[error("Channel holds no usable frame")]
    StaleOrEmptyFrame,

    /// The cross-process lock could not be acquired or initialized.
    #[error("Channel lock failed on '{name}': {reason}")]
    Lock { name: String, reason: String },

    /// A frame decoded by a channel-level helper was malformed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
