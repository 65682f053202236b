//! # Geometric transforms
//!
//! Conversions between the frames used by perception:
//!
//! - Image pixel space: origin top left, row major.
//! - Rover centric frame: origin at the bottom centre of the rectified image, `x` forward and `y`
//!   to the left, in rectified pixels.
//! - Rover polar frame: distance and angle from the rover, angle 0 straight ahead, positive left.
//! - World grid: integer cells of the world map.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::GrayImage;
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point in the rover centric frame.
///
/// Units: rectified image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoverCentricPoint {
    /// Distance ahead of the rover
    pub x: f64,

    /// Distance to the left of the rover
    pub y: f64,
}

/// A point in the rover polar frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    /// Distance from the rover.
    ///
    /// Units: rectified image pixels
    pub dist: f64,

    /// Angle from the rover's forward axis, positive to the left.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// The index of a cell in the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldCell {
    pub x: usize,
    pub y: usize,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the rover centric position of every set pixel in the mask.
///
/// Points are returned in row major scan order of the mask.
pub fn to_rover_coords(mask: &GrayImage) -> Vec<RoverCentricPoint> {
    let height = mask.height() as f64;
    let half_width = mask.width() as f64 / 2.0;

    mask.enumerate_pixels()
        .filter(|(_, _, px)| px.0[0] != 0)
        .map(|(col, row, _)| RoverCentricPoint {
            x: height - row as f64,
            y: half_width - col as f64,
        })
        .collect()
}

/// Convert rover centric points into polar form.
pub fn to_polar(points: &[RoverCentricPoint]) -> Vec<PolarPoint> {
    points
        .iter()
        .map(|p| PolarPoint {
            dist: (p.x.powi(2) + p.y.powi(2)).sqrt(),
            angle_rad: p.y.atan2(p.x),
        })
        .collect()
}

/// Rotate a point by the given yaw.
pub fn rotate(x: f64, y: f64, yaw_deg: f64) -> (f64, f64) {
    let rotated = Rotation2::new(yaw_deg.to_radians()) * Vector2::new(x, y);
    (rotated.x, rotated.y)
}

/// Scale a point from pixels into world units and move it to the rover's position.
pub fn translate_and_scale(x: f64, y: f64, pos_x: f64, pos_y: f64, scale: f64) -> (f64, f64) {
    (x / scale + pos_x, y / scale + pos_y)
}

/// Project rover centric points into the world map.
///
/// Each point is rotated by the rover's yaw, scaled and translated to the rover's position, then
/// truncated onto the grid. Points outside the map are clipped onto the border cells on each axis
/// independently.
pub fn to_world(
    points: &[RoverCentricPoint],
    pos: &Vector2<f64>,
    yaw_deg: f64,
    world_size: usize,
    scale: f64,
) -> Vec<WorldCell> {
    if world_size == 0 {
        return Vec::new();
    }

    let max_idx = world_size as i64 - 1;

    points
        .iter()
        .map(|p| {
            let (rx, ry) = rotate(p.x, p.y, yaw_deg);
            let (x, y) = translate_and_scale(rx, ry, pos.x, pos.y, scale);

            WorldCell {
                x: (x as i64).max(0).min(max_idx) as usize,
                y: (y as i64).max(0).min(max_idx) as usize,
            }
        })
        .collect()
}

/// Mean angle of the points in degrees, or `None` if there are no points.
pub fn mean_angle_deg(points: &[PolarPoint]) -> Option<f64> {
    util::maths::mean(points.iter().map(|p| p.angle_rad.to_degrees()))
}

/// Mean distance of the points, or `None` if there are no points.
pub fn mean_dist(points: &[PolarPoint]) -> Option<f64> {
    util::maths::mean(points.iter().map(|p| p.dist))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
