//! The in-process authoritative aircraft set of the analysis process.

use std::collections::BTreeMap;

use crate::aircraft::{AircraftId, AircraftState};

/// Authoritative aircraft map inside the analysis process.
///
/// Refreshed wholesale from the sensor feed: every refresh replaces the entire
/// set, so there is no cross-cycle identity beyond the ID and aircraft absent
/// from the feed are discarded. The conflict scan mutates violation flags in
/// place between refreshes.
///
/// Keyed on a `BTreeMap` so pair enumeration is deterministic.
#[derive(Debug, Default)]
pub struct Roster {
    aircraft: BTreeMap<AircraftId, AircraftState>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole set with the states decoded from the latest feed
    /// frame. Entries not present in `states` are dropped; duplicate IDs keep
    /// the last record.
    pub fn replace_all(&mut self, states: Vec<AircraftState>) {
        self.aircraft = states.into_iter().map(|s| (s.id, s)).collect();
    }

    /// IDs in ascending order.
    pub fn ids(&self) -> Vec<AircraftId> {
        self.aircraft.keys().copied().collect()
    }

    pub fn get(&self, id: AircraftId) -> Option<&AircraftState> {
        self.aircraft.get(&id)
    }

    pub fn contains(&self, id: AircraftId) -> bool {
        self.aircraft.contains_key(&id)
    }

    /// Clears every violation flag ahead of a scan.
    pub fn clear_violations(&mut self) {
        for state in self.aircraft.values_mut() {
            state.violation = false;
        }
    }

    /// Marks one aircraft as involved in a violation or imminent conflict.
    pub fn mark_violation(&mut self, id: AircraftId) {
        if let Some(state) = self.aircraft.get_mut(&id) {
            state.violation = true;
        }
    }

    /// Read-only snapshot in ascending ID order, for the publish tasks.
    pub fn snapshot(&self) -> Vec<AircraftState> {
        self.aircraft.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::Vec3;

    fn state(id: AircraftId) -> AircraftState {
        AircraftState::new(id, Vec3::default(), Vec3::default(), 0)
    }

    #[test]
    fn test_replace_all_discards_absent_aircraft() {
        let mut roster = Roster::new();
        roster.replace_all(vec![state(1), state(2), state(3)]);
        assert_eq!(roster.len(), 3);

        roster.replace_all(vec![state(2), state(4)]);
        assert_eq!(roster.ids(), vec![2, 4]);
        assert!(!roster.contains(1));
    }

    #[test]
    fn test_replace_all_resets_violation_flags() {
        let mut roster = Roster::new();
        roster.replace_all(vec![state(1)]);
        roster.mark_violation(1);
        assert!(roster.get(1).is_some_and(|s| s.violation));

        // A refresh carries fresh states; flags do not survive it.
        roster.replace_all(vec![state(1)]);
        assert!(roster.get(1).is_some_and(|s| !s.violation));
    }

    #[test]
    fn test_mark_and_clear_violations() {
        let mut roster = Roster::new();
        roster.replace_all(vec![state(1), state(2)]);

        roster.mark_violation(1);
        roster.mark_violation(2);
        assert!(roster.snapshot().iter().all(|s| s.violation));

        roster.clear_violations();
        assert!(roster.snapshot().iter().all(|s| !s.violation));
    }

    #[test]
    fn test_mark_violation_unknown_id_is_noop() {
        let mut roster = Roster::new();
        roster.replace_all(vec![state(1)]);
        roster.mark_violation(99);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_snapshot_is_ascending_by_id() {
        let mut roster = Roster::new();
        roster.replace_all(vec![state(9), state(3), state(7)]);
        let ids: Vec<_> = roster.snapshot().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 7, 9]);
    }
}
