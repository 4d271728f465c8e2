//! Skymon IPC - process infrastructure for the monitoring network.
//!
//! This crate provides everything a skymon process needs besides its domain
//! logic:
//! - `channel` - named fixed-capacity shared-memory regions with an
//!   atomic-frame read/write contract, one cross-process mutex per channel
//! - `registry` - the fixed table of channel names, capacities and lifecycle
//!   helpers shared by every process
//! - `scheduler` - the periodic task driver (measure, warn on missed
//!   deadlines, skip instead of queue)
//! - `coordinator` - the distributed termination handshake
//!
//! # Architecture
//!
//! ```text
//!  sensor ──[sensor-feed]──▶ skymond ──[aircraft-state / alerts]──▶ display
//!                               ▲ │
//!          [operator-commands]  │ └──[relay-commands]──▶ relay
//!  operator ────────────────────┘           [sensor-commands]──▶ sensor
//!
//!  any process ──[termination]──▶ all processes
//! ```
//!
//! Within one channel all reads and writes are totally ordered by its mutex;
//! across channels there is no ordering guarantee.

pub mod channel;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod scheduler;

// Re-exports for convenience
pub use channel::{Channel, Frame};
pub use coordinator::{CoordinatorState, TerminationCoordinator, Trigger};
pub use error::ChannelError;
pub use registry::{channel_name, destroy_all, open_channel, ChannelKind};
pub use scheduler::spawn_periodic;
