//! Skymon Core - Shared domain types for the air-traffic monitoring network
//!
//! This crate provides the domain layer shared between the analysis daemon
//! (skymond) and the peripheral station processes: aircraft kinematic state,
//! the pair-wise conflict detector, the in-process roster, the priority-ordered
//! alert queue and the monitor configuration.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]` in
//! non-test code.

pub mod aircraft;
pub mod alert;
pub mod config;
pub mod conflict;
pub mod error;
pub mod roster;

// Re-exports for convenience
pub use aircraft::{AircraftId, AircraftState, Vec3};
pub use alert::{Alert, AlertQueue};
pub use config::{MonitorConfig, Prediction, Separation, TaskPeriods};
pub use conflict::{assess_pair, predict_conflict, violates, ConflictAssessment};
pub use error::{ConfigError, DomainError};
pub use roster::Roster;
