//! # Rover State
//!
//! The record shared between perception and decision. The control loop owns it for the whole run
//! and lends it to each stage by exclusive reference, once per cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use image::RgbImage;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{map::WorldMap, per::geom::PolarPoint};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of the rover.
#[derive(Debug, Clone)]
pub struct RoverState {
    // ---- KINEMATICS ----
    /// Position of the rover in the world.
    ///
    /// Units: world map cells
    pub pos: Vector2<f64>,

    /// Heading of the rover, in [0, 360).
    ///
    /// Units: degrees
    pub yaw: f64,

    /// Units: degrees, in [0, 360)
    pub pitch: f64,

    /// Units: degrees, in [0, 360)
    pub roll: f64,

    /// Signed forward speed
    pub vel: f64,

    // ---- DECISION ----
    /// Current driving mode
    pub mode: DriveMode,

    /// Throttle demand, negative to reverse
    pub throttle: f64,

    /// Brake demand
    pub brake: f64,

    /// Steering demand, positive to the left.
    ///
    /// Units: degrees
    pub steer: f64,

    // ---- PERCEPTION ----
    /// Navigable terrain seen this cycle, or `None` if perception has not produced any data.
    pub nav: Option<Vec<PolarPoint>>,

    /// Rock sample pixels seen this cycle
    pub rocks: Vec<PolarPoint>,

    /// Obstacle (red), rock (green) and navigable (blue) overlay of the latest image
    pub vision_image: RgbImage,

    /// Evidence accumulated over the whole run
    pub world_map: WorldMap,

    // ---- SAMPLES ----
    /// Set by the simulator when a sample is within reach
    pub near_sample: bool,

    /// Set by the simulator while the arm is picking up a sample
    pub picking_up: bool,

    /// Set by decision to request the pickup of a nearby sample
    pub send_pickup: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Driving modes of the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveMode {
    /// Driving towards open terrain
    Forward,

    /// Stopping, or stopped and looking for open terrain
    Stop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoverState {
    /// Create the initial state, with an empty world map of `world_size` cells square and a blank
    /// vision image of the camera's size.
    pub fn new(world_size: usize, image_width: u32, image_height: u32) -> Self {
        Self {
            pos: Vector2::zeros(),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            vel: 0.0,
            mode: DriveMode::Forward,
            throttle: 0.0,
            brake: 0.0,
            steer: 0.0,
            nav: None,
            rocks: Vec::new(),
            vision_image: RgbImage::new(image_width, image_height),
            world_map: WorldMap::new(world_size),
            near_sample: false,
            picking_up: false,
            send_pickup: false,
        }
    }

    /// Number of navigable terrain points seen this cycle, if any data is available.
    pub fn nav_count(&self) -> Option<usize> {
        self.nav.as_ref().map(|n| n.len())
    }
}

impl Default for DriveMode {
    fn default() -> Self {
        DriveMode::Forward
    }
}

impl Display for DriveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveMode::Forward => write!(f, "DriveMode::Forward"),
            DriveMode::Stop => write!(f, "DriveMode::Stop"),
        }
    }
}
