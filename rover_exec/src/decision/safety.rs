//! # Attitude safety
//!
//! Backs the rover away when it has started to climb an obstacle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{DriveCmd, DriveParams};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the override command if the rover's attitude is outside the safe limits.
///
/// The rover reverses straight back, with no throttle once it is already reversing at the maximum
/// speed.
pub(super) fn attitude_override(
    params: &DriveParams,
    pitch_deg: f64,
    roll_deg: f64,
    vel: f64,
) -> Option<DriveCmd> {
    let pitch_bad = off_level(pitch_deg, params.pitch_limit_deg);
    let roll_bad = off_level(roll_deg, params.roll_limit_deg);

    if !pitch_bad && !roll_bad {
        return None;
    }

    let throttle = if vel > -params.max_vel {
        params.reverse_throttle
    } else {
        0.0
    };

    Some(DriveCmd {
        throttle,
        brake: 0.0,
        steer_deg: 0.0,
    })
}

/// Returns true if an angle in [0, 360) is more than `limit_deg` away from level on either side
/// of the wrap.
fn off_level(angle_deg: f64, limit_deg: f64) -> bool {
    (angle_deg < 180.0 && angle_deg > limit_deg)
        || (angle_deg > 180.0 && 360.0 - angle_deg > limit_deg)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
