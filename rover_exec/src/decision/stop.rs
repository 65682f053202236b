//! # Stop mode
//!
//! Brake to a halt, then turn on the spot until enough open terrain is in view to drive off.

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
/// - `Forward` once stopped with at least `go_forward` navigable points visible
pub(super) fn step(params: &DriveParams, nav: &[PolarPoint], vel: f64) -> StepOutput {
    if vel > params.stopped_vel_max {
        StepOutput {
            cmd: DriveCmd::brake(params),
            transition: None,
            branch: Branch::StopBraking,
        }
    } else if nav.len() < params.go_forward {
        StepOutput {
            cmd: DriveCmd {
                throttle: 0.0,
                brake: 0.0,
                steer_deg: params.search_steer_deg,
            },
            transition: None,
            branch: Branch::StopSearching,
        }
    } else {
        let throttle = proportional_throttle(params, nav);

        match steer_rover(params, nav, throttle) {
            Some((throttle, steer_deg)) => StepOutput {
                cmd: DriveCmd {
                    throttle,
                    brake: 0.0,
                    steer_deg,
                },
                transition: Some(DriveMode::Forward),
                branch: Branch::StopGo,
            },
            None => StepOutput::no_nav_data(params),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
