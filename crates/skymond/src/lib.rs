//! Skymon Daemon - the analysis process.
//!
//! This crate hosts the monitoring engine: the authoritative aircraft roster,
//! the O(n^2) conflict scan, the priority-ordered alert pipeline and the
//! operator command handling, all driven as independent periodic tasks over
//! the shared channels.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          skymond                              │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  [sensor-feed] ──▶ roster-refresh ──┐                         │
//! │                                     ▼                         │
//! │                     MonitorState (Roster ▸ AlertQueue)        │
//! │                          ▲ │                 │                │
//! │       conflict-scan ─────┘ │                 ▼                │
//! │       state-publish ◀──────┘          alert-flush ──▶ [alerts]│
//! │            │                                                  │
//! │            ▼                       command-poll               │
//! │    [aircraft-state]   [operator-commands] ─▶ [relay-commands] │
//! │                                           └▶ [augmented-info] │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tasks needing both the roster and the alert queue always lock the roster
//! first; lock hold time covers compute and copy only, never channel I/O.

pub mod engine;
pub mod run;
pub mod state;

pub use engine::AnalysisEngine;
pub use run::run;
pub use state::MonitorState;
