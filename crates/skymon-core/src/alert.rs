//! Alert records and the priority-ordered alert pipeline.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::aircraft::AircraftId;

/// One pending alert.
///
/// `time` is the priority key: 0 for a current violation, otherwise the
/// predicted seconds until the pair enters violation. Lower times are more
/// urgent and drain first.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Priority time in seconds; 0 means the violation is happening now.
    pub time: f64,

    /// Human-readable message referencing both aircraft IDs.
    pub message: String,
}

impl Alert {
    /// Alert for a separation breach happening right now.
    pub fn violation(a: AircraftId, b: AircraftId) -> Self {
        Self {
            time: 0.0,
            message: format!("Violation currently happening between {a} and {b}."),
        }
    }

    /// Alert for a predicted conflict within the look-ahead horizon.
    pub fn predicted(time: f64, a: AircraftId, b: AircraftId) -> Self {
        Self {
            time,
            message: format!("Collision will occur in {time:.2} seconds between {a} and {b}."),
        }
    }

    /// Longer-range advisory for a conflict beyond the horizon.
    pub fn advisory(time: f64, a: AircraftId, b: AircraftId) -> Self {
        Self {
            time,
            message: format!(
                "Separation violation projected in {time:.2} seconds between {a} and {b}."
            ),
        }
    }
}

// Ordering is total via `f64::total_cmp` so alerts can live in a heap; the
// message breaks ties to keep equality consistent with the ordering.
impl PartialEq for Alert {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Alert {}

impl PartialOrd for Alert {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Alert {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.message.cmp(&other.message))
    }
}

/// Min-heap of pending alerts keyed on priority time.
///
/// The conflict scan pushes; the flush cycle drains in ascending time order
/// into the alerts channel. The ordering key is explicit so the semantics stay
/// visible and testable.
#[derive(Debug, Default)]
pub struct AlertQueue {
    heap: BinaryHeap<Reverse<Alert>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an alert to the pipeline.
    pub fn push(&mut self, alert: Alert) {
        self.heap.push(Reverse(alert));
    }

    /// Removes and returns the most urgent pending alert.
    pub fn pop(&mut self) -> Option<Alert> {
        self.heap.pop().map(|Reverse(alert)| alert)
    }

    /// Drains every pending alert in ascending priority-time order.
    pub fn drain_ordered(&mut self) -> Vec<Alert> {
        let mut drained = Vec::with_capacity(self.heap.len());
        while let Some(Reverse(alert)) = self.heap.pop() {
            drained.push(alert);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
