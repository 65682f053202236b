//! # Drive helpers
//!
//! Throttle and steering laws shared by the decision modes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{clamp, lin_map};

use super::DriveParams;
use crate::per::geom::{mean_angle_deg, PolarPoint};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuation demands for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DriveCmd {
    pub throttle: f64,
    pub brake: f64,

    /// Units: degrees, positive left
    pub steer_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCmd {
    /// Release everything and hold the brake.
    pub fn brake(params: &DriveParams) -> Self {
        Self {
            throttle: 0.0,
            brake: params.brake_set,
            steer_deg: 0.0,
        }
    }

    /// Drive straight at the set throttle, used when there is no terrain to steer by.
    pub fn blind(params: &DriveParams) -> Self {
        Self {
            throttle: params.throttle_set,
            brake: 0.0,
            steer_deg: 0.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Scale the throttle with the amount of open terrain close to the rover.
///
/// Zero at or below `stop_forward` nearby navigable points, rising linearly to `throttle_set` at
/// `go_forward` points and held there above.
pub fn proportional_throttle(params: &DriveParams, nav: &[PolarPoint]) -> f64 {
    let free = nav
        .iter()
        .filter(|p| p.dist < params.throttle_dist_px)
        .count();

    let lo = params.stop_forward as f64;
    let hi = params.go_forward as f64;

    lin_map((lo, hi), (0.0, params.throttle_set), clamp(free as f64, lo, hi))
}

/// Steer towards the mean direction of the navigable terrain.
///
/// If the mean is beyond the steering limit the demand is clipped and the throttle released, so
/// the rover turns tightly rather than driving wide. Returns `(throttle, steer_deg)`, or `None` if
/// there is no navigable terrain.
pub fn steer_rover(params: &DriveParams, nav: &[PolarPoint], throttle: f64) -> Option<(f64, f64)> {
    let mean = mean_angle_deg(nav)?;

    if mean.abs() < params.max_steer_deg {
        Some((throttle, mean))
    } else {
        Some((
            0.0,
            clamp(mean, -params.max_steer_deg, params.max_steer_deg),
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn points(n: usize, dist: f64, angle_deg: f64) -> Vec<PolarPoint> {
        vec![
            PolarPoint {
                dist,
                angle_rad: angle_deg.to_radians()
            };
            n
        ]
    }

    #[test]
    fn test_proportional_throttle() {
        let params = DriveParams::default();

        assert_eq!(proportional_throttle(&params, &[]), 0.0);
        assert_eq!(proportional_throttle(&params, &points(50, 10.0, 0.0)), 0.0);
        assert!((proportional_throttle(&params, &points(500, 10.0, 0.0)) - 0.2).abs() < 1e-12);
        assert!((proportional_throttle(&params, &points(900, 10.0, 0.0)) - 0.2).abs() < 1e-12);
        assert!((proportional_throttle(&params, &points(275, 10.0, 0.0)) - 0.1).abs() < 1e-12);

        // Far terrain doesn't count
        assert_eq!(proportional_throttle(&params, &points(900, 100.0, 0.0)), 0.0);

        let mut monotonic = 0.0;
        for n in (0..700).step_by(7) {
            let t = proportional_throttle(&params, &points(n, 10.0, 0.0));
            assert!(t >= monotonic);
            monotonic = t;
        }
    }

    #[test]
    fn test_steer_rover() {
        let params = DriveParams::default();

        assert_eq!(steer_rover(&params, &[], 0.2), None);

        let (t, s) = steer_rover(&params, &points(10, 10.0, 5.0), 0.2).unwrap();
        assert_eq!(t, 0.2);
        assert!((s - 5.0).abs() < 1e-9);

        assert_eq!(
            steer_rover(&params, &points(10, 10.0, 40.0), 0.2),
            Some((0.0, 15.0))
        );
        assert_eq!(
            steer_rover(&params, &points(10, 10.0, -40.0), 0.2),
            Some((0.0, -15.0))
        );
    }
}
