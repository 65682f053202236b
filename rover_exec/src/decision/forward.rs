//! # Forward mode
//!
//! Drive along the open terrain until there is too little of it ahead.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{
    drive::{proportional_throttle, steer_rover},
    Branch, DriveCmd, DriveParams, StepOutput,
};
use crate::{per::geom::PolarPoint, state::DriveMode};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Possible transitions:
/// - `Stop` when fewer than `stop_forward` navigable points are visible
pub(super) fn step(params: &DriveParams, nav: &[PolarPoint], vel: f64) -> StepOutput {
    if nav.len() < params.stop_forward {
        return StepOutput {
            cmd: DriveCmd::brake(params),
            transition: Some(DriveMode::Stop),
            branch: Branch::ForwardStopping,
        };
    }

    let throttle = if vel < params.max_vel {
        proportional_throttle(params, nav)
    } else {
        0.0
    };

    match steer_rover(params, nav, throttle) {
        Some((throttle, steer_deg)) => StepOutput {
            cmd: DriveCmd {
                throttle,
                brake: 0.0,
                steer_deg,
            },
            transition: None,
            branch: Branch::Forward,
        },
        None => StepOutput::no_nav_data(params),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
