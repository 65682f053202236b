//! # Decision Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the decision state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveParams {
    // ---- DRIVING ----
    /// Throttle demand when driving freely
    pub throttle_set: f64,

    /// Brake demand when stopping
    pub brake_set: f64,

    /// Maximum forward speed, throttle is released above this.
    pub max_vel: f64,

    /// Maximum steering demand in either direction.
    ///
    /// Units: degrees
    pub max_steer_deg: f64,

    /// Only navigable terrain closer than this is counted when scaling the throttle.
    ///
    /// Units: rectified pixels
    pub throttle_dist_px: f64,

    // ---- MODE SWITCHING ----
    /// Number of navigable pixels below which the rover stops
    pub stop_forward: usize,

    /// Number of navigable pixels above which a stopped rover drives off again
    pub go_forward: usize,

    /// Speed below which the rover is considered stopped
    pub stopped_vel_max: f64,

    /// Steering demand while turning on the spot to look for open terrain.
    ///
    /// Units: degrees
    pub search_steer_deg: f64,

    // ---- ROCK FOLLOWING ----
    /// Target approach speed per rectified pixel of distance to a rock
    pub rock_speed_gain: f64,

    /// Slowest approach speed to a rock
    pub rock_min_speed: f64,

    /// Fastest approach speed to a rock
    pub rock_max_speed: f64,

    /// Half width of the band around the target approach speed in which the rover coasts
    pub rock_speed_band: f64,

    // ---- SAFETY ----
    /// Pitch away from level above which the rover backs off.
    ///
    /// Units: degrees
    pub pitch_limit_deg: f64,

    /// Roll away from level above which the rover backs off.
    ///
    /// Units: degrees
    pub roll_limit_deg: f64,

    /// Throttle demand while backing off
    pub reverse_throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            throttle_set: 0.2,
            brake_set: 10.0,
            max_vel: 2.0,
            max_steer_deg: 15.0,
            throttle_dist_px: 100.0,
            stop_forward: 50,
            go_forward: 500,
            stopped_vel_max: 0.2,
            search_steer_deg: 15.0,
            rock_speed_gain: 0.025,
            rock_min_speed: 0.05,
            rock_max_speed: 0.4,
            rock_speed_band: 0.05,
            pitch_limit_deg: 1.0,
            roll_limit_deg: 2.0,
            reverse_throttle: -0.2,
        }
    }
}
