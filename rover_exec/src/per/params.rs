//! # Perception Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::classify::{ColorThresh, NAV_THRESH, ROCK_THRESH};
use crate::map::AttitudeGate;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the perception manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerParams {
    // ---- CAMERA ----
    /// Width of the camera images.
    ///
    /// Units: pixels
    pub image_width: u32,

    /// Height of the camera images.
    ///
    /// Units: pixels
    pub image_height: u32,

    /// Corners of a one world unit grid square as seen by the camera, ordered bottom left, bottom
    /// right, top right, top left.
    ///
    /// Units: pixels
    pub src_points_px: [[f64; 2]; 4],

    /// Side of the square the calibration corners are rectified onto.
    ///
    /// Units: pixels
    pub dst_size_px: f64,

    // ---- CLASSIFICATION ----
    /// Threshold band of navigable terrain
    pub nav_thresh: ColorThresh,

    /// Threshold band of rock samples
    pub rock_thresh: ColorThresh,

    // ---- MAPPING ----
    /// Number of cells along each side of the world map
    pub world_size: usize,

    /// Number of rectified pixels per world map cell.
    ///
    /// Units: pixels/cell
    pub world_scale: f64,

    /// Attitude limits outside of which the map is not updated
    pub map_gate: AttitudeGate,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PerParams {
    /// Calibration of the simulator's forward camera.
    fn default() -> Self {
        Self {
            image_width: 320,
            image_height: 160,
            src_points_px: [[13.0, 139.0], [302.0, 139.0], [200.0, 94.0], [120.0, 94.0]],
            dst_size_px: 10.0,
            nav_thresh: NAV_THRESH,
            rock_thresh: ROCK_THRESH,
            world_size: 200,
            world_scale: 10.0,
            map_gate: AttitudeGate::default(),
        }
    }
}
