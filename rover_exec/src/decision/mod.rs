//! # Decision
//!
//! This module implements the [`DecisionMgr`], the state machine which turns the perception
//! outputs held in the [`RoverState`] into drive demands. The machine has two modes:
//!
//! - `Forward` - Driving along the open terrain, steering towards its mean direction.
//! - `Stop` - Braking to a halt, then turning on the spot until there is enough open terrain to
//!   drive off.
//!
//! Visible rock samples take priority over both modes. Every cycle then ends with two overrides,
//! a sample pickup request and an attitude safety back off.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod drive;
mod follow_rock;
mod forward;
mod params;
mod safety;
mod stop;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::Serialize;

pub use drive::{proportional_throttle, steer_rover, DriveCmd};
pub use params::DriveParams;

use crate::state::{DriveMode, RoverState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decision manager.
#[derive(Debug, Clone)]
pub struct DecisionMgr {
    params: DriveParams,
}

/// Output of a mode's step function.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StepOutput {
    /// Demands for this cycle
    cmd: DriveCmd,

    /// Mode to switch to, if any
    transition: Option<DriveMode>,

    branch: Branch,
}

/// Summary of one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionReport {
    /// Mode at the end of the cycle
    pub mode: DriveMode,

    pub branch: Branch,

    pub throttle: f64,
    pub brake: f64,
    pub steer_deg: f64,

    /// Number of navigable points, empty if perception has not run
    pub nav_count: Option<usize>,

    pub rock_count: usize,

    pub send_pickup: bool,

    /// True if the attitude safety override replaced the demands
    pub safety_override: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The branch of the decision logic which produced a cycle's demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Branch {
    /// Approaching a visible rock sample
    FollowRock,

    /// Driving in `Forward` mode
    Forward,

    /// Braking on the way out of `Forward` mode
    ForwardStopping,

    /// Braking in `Stop` mode
    StopBraking,

    /// Turning on the spot in `Stop` mode
    StopSearching,

    /// Driving off on the way out of `Stop` mode
    StopGo,

    /// Driving straight with no terrain to steer by
    NoNavData,
}

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("Failed to load DriveParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid decision parameters: {0}")]
    InvalidParams(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DecisionMgr {
    /// Load the parameters from the given file in the params directory and create the manager.
    pub fn init(params_path: &str) -> Result<Self, DecisionError> {
        let params = util::params::load(params_path).map_err(DecisionError::ParamLoadError)?;
        Self::new(params)
    }

    /// Create the manager, checking that the parameters are consistent.
    pub fn new(params: DriveParams) -> Result<Self, DecisionError> {
        if params.go_forward <= params.stop_forward {
            return Err(DecisionError::InvalidParams(format!(
                "go_forward ({}) must be greater than stop_forward ({})",
                params.go_forward, params.stop_forward
            )));
        }

        let positive = [
            ("max_vel", params.max_vel),
            ("max_steer_deg", params.max_steer_deg),
            ("throttle_dist_px", params.throttle_dist_px),
            ("pitch_limit_deg", params.pitch_limit_deg),
            ("roll_limit_deg", params.roll_limit_deg),
        ];
        let non_negative = [
            ("throttle_set", params.throttle_set),
            ("brake_set", params.brake_set),
            ("stopped_vel_max", params.stopped_vel_max),
            ("rock_speed_gain", params.rock_speed_gain),
            ("rock_min_speed", params.rock_min_speed),
            ("rock_speed_band", params.rock_speed_band),
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(DecisionError::InvalidParams(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in non_negative.iter() {
            if !(*value >= 0.0) {
                return Err(DecisionError::InvalidParams(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if params.rock_max_speed < params.rock_min_speed {
            return Err(DecisionError::InvalidParams(format!(
                "rock_max_speed ({}) is below rock_min_speed ({})",
                params.rock_max_speed, params.rock_min_speed
            )));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &DriveParams {
        &self.params
    }

    /// Run one decision cycle, writing the demands and the new mode into the state.
    pub fn step(&self, state: &mut RoverState) -> DecisionReport {
        let prev_mode = state.mode;

        let output = match follow_rock::step(&self.params, &state.rocks, state.vel) {
            Some(o) => o,
            None => match (&state.nav, state.mode) {
                (Some(nav), DriveMode::Forward) => forward::step(&self.params, nav, state.vel),
                (Some(nav), DriveMode::Stop) => stop::step(&self.params, nav, state.vel),
                (None, _) => StepOutput::no_nav_data(&self.params),
            },
        };

        if output.branch == Branch::NoNavData {
            debug!("No navigable terrain data, driving straight");
        }

        let mut cmd = output.cmd;
        if let Some(mode) = output.transition {
            state.mode = mode;
        }

        state.send_pickup = state.near_sample && state.vel == 0.0 && !state.picking_up;
        if state.send_pickup {
            info!("Requesting sample pickup");
        }

        let safety = safety::attitude_override(&self.params, state.pitch, state.roll, state.vel);
        if let Some(c) = safety {
            warn!(
                "Attitude outside limits (pitch {:.2} deg, roll {:.2} deg), backing off",
                state.pitch, state.roll
            );
            cmd = c;
        }

        state.throttle = cmd.throttle;
        state.brake = cmd.brake;
        state.steer = cmd.steer_deg;

        if state.mode != prev_mode {
            info!("Mode change: {} -> {}", prev_mode, state.mode);
        }

        DecisionReport {
            mode: state.mode,
            branch: output.branch,
            throttle: cmd.throttle,
            brake: cmd.brake,
            steer_deg: cmd.steer_deg,
            nav_count: state.nav_count(),
            rock_count: state.rocks.len(),
            send_pickup: state.send_pickup,
            safety_override: safety.is_some(),
        }
    }
}

impl StepOutput {
    /// Output when there is no navigable terrain to steer by.
    fn no_nav_data(params: &DriveParams) -> Self {
        Self {
            cmd: DriveCmd::blind(params),
            transition: None,
            branch: Branch::NoNavData,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::geom::PolarPoint;

    fn mgr() -> DecisionMgr {
        DecisionMgr::new(DriveParams::default()).unwrap()
    }

    fn state() -> RoverState {
        RoverState::new(20, 32, 16)
    }

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
    fn test_forward_open_terrain() {
        let mut state = state();
        state.nav = Some(points(550, 40.0, 0.0));
        state.vel = 0.0;

        let report = mgr().step(&mut state);

        assert!((state.throttle - 0.2).abs() < 1e-12);
        assert_eq!(state.brake, 0.0);
        assert_eq!(state.steer, 0.0);
        assert_eq!(state.mode, DriveMode::Forward);
        assert_eq!(report.branch, Branch::Forward);
        assert_eq!(report.nav_count, Some(550));
    }

    #[test]
    fn test_forward_to_stop() {
        let mut state = state();
        state.nav = Some(points(49, 40.0, 0.0));
        state.vel = 1.0;
        state.steer = 5.0;

        mgr().step(&mut state);

        assert_eq!(state.throttle, 0.0);
        assert_eq!(state.brake, 10.0);
        assert_eq!(state.steer, 0.0);
        assert_eq!(state.mode, DriveMode::Stop);
    }

    #[test]
    fn test_follow_rock() {
        let mut state = state();
        state.nav = Some(points(1000, 40.0, 10.0));
        state.rocks = points(30, 40.0, 0.0);
        state.vel = 0.3;

        let report = mgr().step(&mut state);

        assert_eq!(state.throttle, 0.2);
        assert_eq!(state.brake, 0.0);
        assert_eq!(state.steer, 0.0);
        assert_eq!(state.mode, DriveMode::Stop);
        assert_eq!(report.branch, Branch::FollowRock);
        assert_eq!(report.rock_count, 30);
    }

    #[test]
    fn test_stop_searching() {
        let mut state = state();
        state.mode = DriveMode::Stop;
        state.nav = Some(points(499, 40.0, 0.0));
        state.vel = 0.1;

        mgr().step(&mut state);

        assert_eq!(state.steer, 15.0);
        assert_eq!(state.throttle, 0.0);
        assert_eq!(state.brake, 0.0);
        assert_eq!(state.mode, DriveMode::Stop);
    }

    #[test]
    fn test_stop_to_forward() {
        let mut state = state();
        state.mode = DriveMode::Stop;
        state.nav = Some(points(600, 40.0, 0.0));
        state.vel = 0.0;

        let report = mgr().step(&mut state);

        assert_eq!(state.mode, DriveMode::Forward);
        assert_eq!(report.branch, Branch::StopGo);
        assert!(state.throttle > 0.0);
    }

    #[test]
    fn test_no_nav_data() {
        let mut state = state();
        state.mode = DriveMode::Stop;

        let report = mgr().step(&mut state);

        assert_eq!(state.throttle, 0.2);
        assert_eq!(state.brake, 0.0);
        assert_eq!(state.steer, 0.0);
        assert_eq!(state.mode, DriveMode::Stop);
        assert_eq!(report.branch, Branch::NoNavData);
        assert_eq!(report.nav_count, None);
    }

    #[test]
    fn test_pickup() {
        let mgr = mgr();
        let mut state = state();
        state.nav = Some(points(550, 40.0, 0.0));
        state.near_sample = true;

        assert!(mgr.step(&mut state).send_pickup);
        assert!(state.send_pickup);

        state.picking_up = true;
        assert!(!mgr.step(&mut state).send_pickup);

        state.picking_up = false;
        state.vel = 0.5;
        assert!(!mgr.step(&mut state).send_pickup);
    }

    #[test]
    fn test_attitude_override() {
        let mut state = state();
        state.nav = Some(points(550, 40.0, 10.0));
        state.pitch = 358.0;
        state.vel = 1.0;

        let report = mgr().step(&mut state);

        assert!(report.safety_override);
        assert_eq!(report.branch, Branch::Forward);
        assert_eq!(state.throttle, -0.2);
        assert_eq!(state.brake, 0.0);
        assert_eq!(state.steer, 0.0);
        assert_eq!(state.mode, DriveMode::Forward);
    }

    #[test]
    fn test_shipped_params() {
        let params: DriveParams =
            util::params::from_toml_str(include_str!("../../../params/decision.toml")).unwrap();

        assert_eq!(params.stop_forward, 50);
        assert_eq!(params.go_forward, 500);
        assert!(DecisionMgr::new(params).is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let params = DriveParams {
            go_forward: 50,
            ..Default::default()
        };
        assert!(matches!(
            DecisionMgr::new(params),
            Err(DecisionError::InvalidParams(_))
        ));

        let params = DriveParams {
            max_vel: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            DecisionMgr::new(params),
            Err(DecisionError::InvalidParams(_))
        ));

        let params = DriveParams {
            rock_max_speed: 0.01,
            ..Default::default()
        };
        assert!(matches!(
            DecisionMgr::new(params),
            Err(DecisionError::InvalidParams(_))
        ));
    }
}
