//! Shared in-process state of the analysis engine.

use std::sync::{Mutex, MutexGuard, PoisonError};

use skymon_core::{AlertQueue, Roster};

/// The roster and the alert pipeline, shared by every engine task.
///
/// Lock order: tasks needing both always take the roster before the alerts.
/// The fixed order makes deadlock impossible however the periodic tasks
/// interleave.
#[derive(Debug, Default)]
pub struct MonitorState {
    roster: Mutex<Roster>,
    alerts: Mutex<AlertQueue>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the roster. A poisoned lock is recovered rather than propagated:
    /// the roster is wholesale-replaced every refresh, so no partial mutation
    /// can outlive a cycle.
    pub fn lock_roster(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the alert queue. Must not be held while acquiring the roster.
    pub fn lock_alerts(&self) -> MutexGuard<'_, AlertQueue> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skymon_core::Alert;

    #[test]
    fn test_state_starts_empty() {
        let state = MonitorState::new();
        assert!(state.lock_roster().is_empty());
        assert!(state.lock_alerts().is_empty());
    }

    #[test]
    fn test_locks_are_independent() {
        let state = MonitorState::new();
        let roster = state.lock_roster();
        // The alert queue stays reachable while the roster is held.
        state.lock_alerts().push(Alert::violation(1, 2));
        drop(roster);
        assert_eq!(state.lock_alerts().len(), 1);
    }
}
