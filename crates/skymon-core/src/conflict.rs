//! Pair-wise conflict detection.
//!
//! Pure, deterministic and stateless: current-violation checks and closed-form
//! prediction of the earliest future time two aircraft enter violation.
//!
//! The separation test is a deliberately conservative axis-box test, not a
//! circular distance test: a pair violates when either horizontal axis is
//! inside the horizontal threshold while the vertical axis is inside the
//! vertical threshold.

use crate::aircraft::AircraftState;
use crate::config::{Prediction, Separation};

/// Outcome of assessing one unordered aircraft pair.
///
/// The variants are mutually exclusive by construction: a pair already in
/// violation is never also reported as predicted, and a predicted conflict
/// inside the horizon is never reported as an advisory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConflictAssessment {
    /// Separation is breached right now.
    Violation,
    /// Violation begins in the contained number of seconds, within the horizon.
    Predicted(f64),
    /// Violation begins beyond the horizon but within the advisory window.
    Advisory(f64),
    /// No conflict within the advisory window.
    Clear,
}

/// Returns true when the pair currently breaches minimum separation.
///
/// Velocity plays no part: this is a pure position test.
pub fn violates(a: &AircraftState, b: &AircraftState, sep: &Separation) -> bool {
    let d = a.position.delta(&b.position);
    (d.x.abs() < sep.horizontal_ft || d.y.abs() < sep.horizontal_ft)
        && d.z.abs() < sep.vertical_ft
}

/// Predicts the earliest time, in seconds from now, at which the pair enters
/// violation, or `None` when no entry occurs within `horizon_secs`.
///
/// Relative motion of `b` with respect to `a` splits into two independent
/// closed-form sub-problems:
///
/// - horizontal: roots of `A t^2 + B t + C = 0` with
///   `A = dvx^2 + dvy^2`, `B = 2 (dx0 dvx + dy0 dvy)`,
///   `C = dx0^2 + dy0^2 - H^2`; with `A = 0` the condition holds for all time
///   iff the initial horizontal distance is within `H`.
/// - vertical: roots of `|dz0 + dvz t| = V`; with `dvz = 0` the condition
///   holds for all time iff `|dz0| <= V`.
///
/// Both conditions must hold simultaneously, so the combined entry time is the
/// later of the two; the result is `None` when either sub-problem is unsolved
/// or the combined time exceeds the horizon.
pub fn predict_conflict(
    a: &AircraftState,
    b: &AircraftState,
    sep: &Separation,
    horizon_secs: f64,
) -> Option<f64> {
    let dp = b.position.delta(&a.position);
    let dv = b.velocity.delta(&a.velocity);

    let quad_a = dv.x * dv.x + dv.y * dv.y;
    let quad_b = 2.0 * (dp.x * dv.x + dp.y * dv.y);
    let quad_c = dp.x * dp.x + dp.y * dp.y - sep.horizontal_ft * sep.horizontal_ft;

    let horizontal = if quad_a == 0.0 {
        // No relative horizontal motion: inside the threshold forever or never.
        if (dp.x * dp.x + dp.y * dp.y).sqrt() <= sep.horizontal_ft {
            Some(0.0)
        } else {
            None
        }
    } else {
        earliest_quadratic_root(quad_a, quad_b, quad_c)
    };

    let vertical = earliest_vertical_entry(dp.z, dv.z, sep.vertical_ft);

    match (horizontal, vertical) {
        (Some(t_h), Some(t_v)) => {
            let entry = t_h.max(t_v);
            (entry <= horizon_secs).then_some(entry)
        }
        _ => None,
    }
}

/// Applies the violation-first priority policy to one pair.
///
/// A current violation short-circuits prediction entirely; prediction inside
/// the horizon beats the longer-range advisory.
pub fn assess_pair(
    a: &AircraftState,
    b: &AircraftState,
    sep: &Separation,
    prediction: &Prediction,
) -> ConflictAssessment {
    if violates(a, b, sep) {
        return ConflictAssessment::Violation;
    }
    match predict_conflict(a, b, sep, prediction.advisory_horizon_secs) {
        Some(t) if t <= prediction.horizon_secs => ConflictAssessment::Predicted(t),
        Some(t) => ConflictAssessment::Advisory(t),
        None => ConflictAssessment::Clear,
    }
}

/// Earliest non-negative root of `a t^2 + b t + c = 0`, `a != 0`.
fn earliest_quadratic_root(a: f64, b: f64, c: f64) -> Option<f64> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) / (2.0 * a);
    let t2 = (-b + sqrt_d) / (2.0 * a);
    // a > 0 here, so t1 <= t2.
    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Earliest non-negative time at which `|dz0 + dvz t| = limit` holds.
fn earliest_vertical_entry(dz0: f64, dvz: f64, limit: f64) -> Option<f64> {
    if dvz == 0.0 {
        // Constant vertical offset: inside forever or never.
        return (dz0.abs() <= limit).then_some(0.0);
    }
    let mut t1 = (limit - dz0) / dvz;
    let mut t2 = (-limit - dz0) / dvz;
    if t1 > t2 {
        std::mem::swap(&mut t1, &mut t2);
    }
    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::Vec3;

    fn aircraft(id: u32, pos: (f64, f64, f64), vel: (f64, f64, f64)) -> AircraftState {
        AircraftState::new(
            id,
            Vec3::new(pos.0, pos.1, pos.2),
            Vec3::new(vel.0, vel.1, vel.2),
            0,
        )
    }

    fn sep() -> Separation {
        Separation::default()
    }

    #[test]
    fn test_violates_is_velocity_independent() {
        // Inside the axis box regardless of wildly different velocities.
        let a = aircraft(1, (0.0, 0.0, 0.0), (500.0, -500.0, 100.0));
        let b = aircraft(2, (2000.0, 9000.0, 500.0), (-500.0, 500.0, -100.0));
        assert!(violates(&a, &b, &sep()));
    }

    #[test]
    fn test_violates_requires_vertical_proximity() {
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (1000.0, 1000.0, 2000.0), (0.0, 0.0, 0.0));
        assert!(!violates(&a, &b, &sep()));
    }

    #[test]
    fn test_violates_axis_box_not_circular() {
        // dx >= H and dy >= H: clear even though one diagonal would be close.
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (3000.0, 3000.0, 0.0), (0.0, 0.0, 0.0));
        assert!(!violates(&a, &b, &sep()));

        // dy inside the threshold is enough when dz is inside too.
        let c = aircraft(3, (9000.0, 2999.0, 999.0), (0.0, 0.0, 0.0));
        assert!(violates(&a, &c, &sep()));
    }

    #[test]
    fn test_predict_known_analytic_entry_time() {
        // Head-on along x: |dx| reaches 3000 ft at t = (10000 - 3000) / 100 = 70 s.
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (10000.0, 0.0, 0.0), (-100.0, 0.0, 0.0));

        let t = predict_conflict(&a, &b, &sep(), 120.0).expect("conflict expected");
        assert!((t - 70.0).abs() < 1e-9, "expected 70s, got {t}");
    }

    #[test]
    fn test_predict_beyond_horizon_is_none() {
        // Same geometry, entry at 70 s; a 60 s horizon must reject it.
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (10000.0, 0.0, 0.0), (-100.0, 0.0, 0.0));
        assert_eq!(predict_conflict(&a, &b, &sep(), 60.0), None);
    }

    #[test]
    fn test_predict_diverging_pair_is_none() {
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (10000.0, 0.0, 0.0), (100.0, 0.0, 0.0));
        assert_eq!(predict_conflict(&a, &b, &sep(), 120.0), None);
    }

    #[test]
    fn test_predict_no_relative_motion_inside_threshold() {
        // Identical velocities, already within both thresholds: entry at 0.
        let a = aircraft(1, (0.0, 0.0, 0.0), (50.0, 50.0, 0.0));
        let b = aircraft(2, (1000.0, 500.0, 200.0), (50.0, 50.0, 0.0));
        let t = predict_conflict(&a, &b, &sep(), 120.0).expect("holds for all time");
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_predict_no_relative_motion_outside_threshold() {
        let a = aircraft(1, (0.0, 0.0, 0.0), (50.0, 50.0, 10.0));
        let b = aircraft(2, (40000.0, 40000.0, 200.0), (50.0, 50.0, 10.0));
        assert_eq!(predict_conflict(&a, &b, &sep(), 120.0), None);
    }

    #[test]
    fn test_predict_vertical_gate() {
        // Horizontal entry at 70 s, but 5000 ft apart vertically and closing at
        // 25 ft/s: vertical entry at (5000 - 1000) / 25 = 160 s > horizon.
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (10000.0, 0.0, 5000.0), (-100.0, 0.0, -25.0));
        assert_eq!(predict_conflict(&a, &b, &sep(), 120.0), None);

        // A wider horizon admits it, gated by the vertical entry time.
        let t = predict_conflict(&a, &b, &sep(), 200.0).expect("conflict expected");
        assert!((t - 160.0).abs() < 1e-9, "expected 160s, got {t}");
    }

    #[test]
    fn test_spec_scenario_a1_a2() {
        // Vertical separation of 500 ft is already inside the threshold at t=0;
        // the horizontal gap closes over time. The predicted entry must be
        // finite and strictly between 0 and 120 seconds.
        let a1 = aircraft(1, (1000.0, 2000.0, 3000.0), (100.0, 100.0, 0.0));
        let a2 = aircraft(2, (4000.0, 5500.0, 3500.0), (-100.0, -100.0, 0.0));

        let t = predict_conflict(&a1, &a2, &sep(), 120.0).expect("conflict expected");
        assert!(t > 0.0 && t < 120.0, "expected 0 < t < 120, got {t}");
    }

    #[test]
    fn test_assess_violation_first() {
        // A pair in current violation is never also reported as predicted.
        let a = aircraft(1, (0.0, 0.0, 0.0), (100.0, 0.0, 0.0));
        let b = aircraft(2, (1000.0, 0.0, 0.0), (-100.0, 0.0, 0.0));
        let assessment = assess_pair(&a, &b, &sep(), &Prediction::default());
        assert_eq!(assessment, ConflictAssessment::Violation);
    }

    #[test]
    fn test_assess_predicted_within_horizon() {
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (10000.0, 0.0, 0.0), (-100.0, 0.0, 0.0));
        match assess_pair(&a, &b, &sep(), &Prediction::default()) {
            ConflictAssessment::Predicted(t) => assert!((t - 70.0).abs() < 1e-9),
            other => panic!("expected Predicted, got {other:?}"),
        }
    }

    #[test]
    fn test_assess_advisory_beyond_horizon() {
        // Entry at 170 s: beyond the 120 s horizon, inside the 240 s advisory
        // window.
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (20000.0, 0.0, 0.0), (-100.0, 0.0, 0.0));
        match assess_pair(&a, &b, &sep(), &Prediction::default()) {
            ConflictAssessment::Advisory(t) => assert!((t - 170.0).abs() < 1e-9),
            other => panic!("expected Advisory, got {other:?}"),
        }
    }

    #[test]
    fn test_assess_clear() {
        let a = aircraft(1, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        let b = aircraft(2, (90000.0, 0.0, 0.0), (-100.0, 0.0, 0.0));
        assert_eq!(
            assess_pair(&a, &b, &sep(), &Prediction::default()),
            ConflictAssessment::Clear
        );
    }
}
