//! # Rock following
//!
//! Approach a rock sample seen by the camera, slowing as it gets closer so the rover can stop
//! next to it for pickup.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths::clamp;

use super::{Branch, DriveCmd, DriveParams, StepOutput};
use crate::{
    per::geom::{mean_angle_deg, mean_dist, PolarPoint},
    state::DriveMode,
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Drive towards the rocks, holding the speed in a band around a target that falls with distance.
///
/// The mode is forced to `Stop` so that the rover looks for open terrain once the rock has been
/// collected. Returns `None` if no rocks are visible.
pub(super) fn step(params: &DriveParams, rocks: &[PolarPoint], vel: f64) -> Option<StepOutput> {
    let dist = mean_dist(rocks)?;
    let angle = mean_angle_deg(rocks)?;

    let target_speed = clamp(
        dist * params.rock_speed_gain,
        params.rock_min_speed,
        params.rock_max_speed,
    );
    let steer_deg = clamp(angle, -params.max_steer_deg, params.max_steer_deg);

    let (throttle, brake) = if vel > target_speed + params.rock_speed_band {
        (0.0, params.brake_set)
    } else if vel < target_speed - params.rock_speed_band {
        (params.throttle_set, 0.0)
    } else {
        (0.0, 0.0)
    };

    Some(StepOutput {
        cmd: DriveCmd {
            throttle,
            brake,
            steer_deg,
        },
        transition: Some(DriveMode::Stop),
        branch: Branch::FollowRock,
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
