//! Aircraft kinematic state.

use serde::{Deserialize, Serialize};

/// Unique aircraft identifier, stable for the lifetime of the flight.
pub type AircraftId = u32;

/// A three-component vector in airspace coordinates.
///
/// Used for both positions (feet) and velocities (feet per second).
/// The serialized layout is three consecutive little-endian `f64`s, which
/// keeps the binary sensor-feed record size fixed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise difference `self - other`.
    pub fn delta(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Advances a position by `velocity * dt` seconds.
    pub fn advanced(&self, velocity: &Vec3, dt: f64) -> Vec3 {
        Vec3::new(
            self.x + velocity.x * dt,
            self.y + velocity.y * dt,
            self.z + velocity.z * dt,
        )
    }
}

/// One aircraft as known to the analysis process.
///
/// Owned exclusively by the [`crate::Roster`] while resident. Entries are
/// created on first appearance in the sensor feed, wholesale-replaced on every
/// roster refresh (no cross-cycle identity beyond the ID) and discarded when
/// absent from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftState {
    /// Unique ID, stable for the aircraft's lifetime.
    pub id: AircraftId,

    /// Position in feet.
    pub position: Vec3,

    /// Velocity in feet per second.
    pub velocity: Vec3,

    /// Seconds since scenario start at which the aircraft entered the airspace.
    pub entered_at: i64,

    /// Set when a current separation breach or an imminent predicted conflict
    /// involves this aircraft; cleared by the next scan once no longer true.
    pub violation: bool,
}

impl AircraftState {
    /// Creates a new aircraft state with the violation flag cleared.
    pub fn new(id: AircraftId, position: Vec3, velocity: Vec3, entered_at: i64) -> Self {
        Self {
            id,
            position,
            velocity,
            entered_at,
            violation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_delta() {
        let a = Vec3::new(10.0, 20.0, 30.0);
        let b = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(a.delta(&b), Vec3::new(9.0, 18.0, 27.0));
    }

    #[test]
    fn test_vec3_advanced() {
        let pos = Vec3::new(1000.0, 2000.0, 3000.0);
        let vel = Vec3::new(100.0, -50.0, 0.0);
        assert_eq!(pos.advanced(&vel, 2.0), Vec3::new(1200.0, 1900.0, 3000.0));
    }

    #[test]
    fn test_new_aircraft_has_clear_flag() {
        let state = AircraftState::new(7, Vec3::default(), Vec3::default(), 12);
        assert_eq!(state.id, 7);
        assert_eq!(state.entered_at, 12);
        assert!(!state.violation);
    }
}
