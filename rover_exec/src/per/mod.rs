//! # Perception
//!
//! Turns each forward camera frame into terrain evidence. The [`PerMgr`] runs the pipeline once
//! per cycle:
//!
//! 1. Rectify the frame into a top down view ([`warp`])
//! 2. Classify it into navigable, rock and obstacle masks ([`classify`])
//! 3. Project the masks into the rover and world frames ([`geom`])
//! 4. Accumulate the world cells into the [`WorldMap`](crate::map::WorldMap), and publish the
//!    polar view of the navigable terrain and rocks for decision.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod classify;
pub mod geom;
mod params;
pub mod warp;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::RgbImage;
use log::{debug, trace};
use serde::Serialize;

pub use params::PerParams;

use crate::state::RoverState;
use classify::classify_terrain;
use geom::{to_polar, to_rover_coords, to_world};
use warp::{PerspectiveWarp, WarpError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Perception manager.
#[derive(Debug, Clone)]
pub struct PerMgr {
    params: PerParams,

    /// Calibrated rectification of the camera image
    warp: PerspectiveWarp,
}

/// Summary of one perception cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerReport {
    pub nav_pixels: usize,
    pub rock_pixels: usize,
    pub obstacle_pixels: usize,

    /// True if the world map accepted this cycle's evidence
    pub map_updated: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
pub enum PerError {
    #[error("Invalid perception parameters: {0}")]
    InvalidParams(String),

    #[error("Cannot build the perspective warp: {0}")]
    WarpError(WarpError),

    #[error("Expected a {0}x{1} image but got {2}x{3}")]
    ImageSizeMismatch(u32, u32, u32, u32),
}

/// Errors that can occur while initialising the perception manager.
#[derive(Debug, thiserror::Error)]
pub enum PerInitError {
    #[error("Failed to load PerParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("{0}")]
    PerError(PerError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PerMgr {
    /// Load the parameters from the given file in the params directory and create the manager.
    pub fn init(params_path: &str) -> Result<Self, PerInitError> {
        let params: PerParams =
            util::params::load(params_path).map_err(PerInitError::ParamLoadError)?;
        Self::new(params).map_err(PerInitError::PerError)
    }

    /// Create the manager, validating the parameters and calibrating the rectification.
    pub fn new(params: PerParams) -> Result<Self, PerError> {
        if params.image_width == 0 || params.image_height == 0 {
            return Err(PerError::InvalidParams(format!(
                "image size must be non-zero, got {}x{}",
                params.image_width, params.image_height
            )));
        }
        if params.world_size == 0 {
            return Err(PerError::InvalidParams("world_size must be non-zero".into()));
        }
        if !(params.world_scale > 0.0) {
            return Err(PerError::InvalidParams(format!(
                "world_scale must be positive, got {}",
                params.world_scale
            )));
        }
        for (name, t) in &[("nav_thresh", params.nav_thresh), ("rock_thresh", params.rock_thresh)] {
            if t.lower.iter().zip(t.upper.iter()).any(|(lo, hi)| lo > hi) {
                return Err(PerError::InvalidParams(format!(
                    "{} has a lower bound above its upper bound",
                    name
                )));
            }
        }

        let warp = PerspectiveWarp::from_calibration(
            &params.src_points_px,
            params.image_width,
            params.image_height,
            params.dst_size_px,
        )
        .map_err(PerError::WarpError)?;

        Ok(Self { params, warp })
    }

    pub fn params(&self) -> &PerParams {
        &self.params
    }

    /// Process one camera frame, updating the perception outputs of the state and its world map.
    pub fn step(&self, state: &mut RoverState, image: &RgbImage) -> Result<PerReport, PerError> {
        if image.width() != self.params.image_width || image.height() != self.params.image_height {
            return Err(PerError::ImageSizeMismatch(
                self.params.image_width,
                self.params.image_height,
                image.width(),
                image.height(),
            ));
        }

        let warped = self.warp.apply(image);
        let masks = classify_terrain(&warped, &self.params.nav_thresh, &self.params.rock_thresh);

        state.vision_image = masks.overlay();

        let nav_pts = to_rover_coords(&masks.navigable);
        let rock_pts = to_rover_coords(&masks.rock);
        let obs_pts = to_rover_coords(&masks.obstacle);

        let size = state.world_map.size();
        let scale = self.params.world_scale;
        let nav_cells = to_world(&nav_pts, &state.pos, state.yaw, size, scale);
        let rock_cells = to_world(&rock_pts, &state.pos, state.yaw, size, scale);
        let obs_cells = to_world(&obs_pts, &state.pos, state.yaw, size, scale);

        let map_updated = state.world_map.update(
            &nav_cells,
            &rock_cells,
            &obs_cells,
            state.pitch,
            state.roll,
            &self.params.map_gate,
        );

        state.nav = Some(to_polar(&nav_pts));
        state.rocks = to_polar(&rock_pts);

        let report = PerReport {
            nav_pixels: nav_pts.len(),
            rock_pixels: rock_pts.len(),
            obstacle_pixels: obs_pts.len(),
            map_updated,
        };

        trace!("{:?}", report);
        if !report.map_updated {
            debug!(
                "World map not updated, attitude outside gate (pitch {:.2}, roll {:.2})",
                state.pitch, state.roll
            );
        }

        Ok(report)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
