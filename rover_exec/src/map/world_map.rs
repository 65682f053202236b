//! # World Map
//!
//! Persistent evidence grid for the terrain observed by the rover. Each cell keeps a saturating
//! confidence counter for each [`MapLayer`]. Counters only increase, except that navigable or
//! rock evidence at a cell clears any obstacle evidence there, so a single misread obstacle is
//! overruled once real terrain is seen.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use image::{GrayImage, Rgb, RgbImage};
use log::trace;
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::per::geom::WorldCell;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The world map.
///
/// Serialises as the bare counter array. Deserialising goes through [`WorldMap::from_data`], so a
/// loaded map is checked and has its overlapping evidence resolved like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Array3<u8>", into = "Array3<u8>")]
pub struct WorldMap {
    /// Counter data, indexed `[y, x, layer]`
    data: Array3<u8>,
}

/// Attitude limits within which the camera's flat ground assumption holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeGate {
    /// Maximum pitch away from level.
    ///
    /// Units: degrees
    pub pitch_tol_deg: f64,

    /// Maximum roll away from level.
    ///
    /// Units: degrees
    pub roll_tol_deg: f64,
}

/// Number of cells holding each kind of evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStats {
    pub navigable_cells: usize,
    pub rock_cells: usize,
    pub obstacle_cells: usize,
}

/// Comparison of the map against a ground truth navigable mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fidelity {
    /// Percentage of the true navigable cells which have been mapped as navigable.
    pub percent_mapped: f64,

    /// Percentage of the cells mapped as navigable which are truly navigable.
    pub fidelity: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Layers of the world map.
///
/// The layer order matches the RGB channels of [`WorldMap::to_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapLayer {
    Obstacle,
    Rock,
    Navigable,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MapError {
    #[error("Ground truth is {0}x{1} but the world map is {2}x{2}")]
    GroundTruthShape(u32, u32, usize),

    #[error("Map data must have shape (n, n, 3), found {0:?}")]
    DataShape(Vec<usize>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MapLayer {
    fn index(self) -> usize {
        match self {
            MapLayer::Obstacle => 0,
            MapLayer::Rock => 1,
            MapLayer::Navigable => 2,
        }
    }
}

impl Default for AttitudeGate {
    fn default() -> Self {
        Self {
            pitch_tol_deg: 0.25,
            roll_tol_deg: 2.0,
        }
    }
}

impl AttitudeGate {
    /// Returns true if both pitch and roll are close enough to level, on either side of the 0/360
    /// wrap, for the image to be projected into the map.
    pub fn is_open(&self, pitch_deg: f64, roll_deg: f64) -> bool {
        near_level(pitch_deg, self.pitch_tol_deg) && near_level(roll_deg, self.roll_tol_deg)
    }
}

impl WorldMap {
    /// Create an empty square map with `size` cells along each axis.
    pub fn new(size: usize) -> Self {
        Self {
            data: Array3::zeros((size, size, 3)),
        }
    }

    /// Build a map from existing counter data, indexed `[y, x, layer]`.
    ///
    /// The data must be square with one entry per [`MapLayer`]. Obstacle evidence is cleared from
    /// every cell which also holds navigable or rock evidence.
    pub fn from_data(mut data: Array3<u8>) -> Result<Self, MapError> {
        let shape = data.shape();
        if shape[0] != shape[1] || shape[2] != 3 {
            return Err(MapError::DataShape(shape.to_vec()));
        }

        for mut cell in data.lanes_mut(Axis(2)) {
            if cell[MapLayer::Navigable.index()] > 0 || cell[MapLayer::Rock.index()] > 0 {
                cell[MapLayer::Obstacle.index()] = 0;
            }
        }

        Ok(Self { data })
    }

    /// Number of cells along each axis.
    pub fn size(&self) -> usize {
        self.data.shape()[0]
    }

    /// Get the counter of a layer at a cell, or `None` if the cell is outside the map.
    pub fn get(&self, cell: WorldCell, layer: MapLayer) -> Option<u8> {
        self.data.get([cell.y, cell.x, layer.index()]).copied()
    }

    /// Accumulate one tick of evidence into the map.
    ///
    /// Nothing is changed unless the attitude gate is open. Otherwise each listed cell's counter
    /// for its layer is incremented (saturating at 255), then any of the touched cells which hold
    /// navigable or rock evidence have their obstacle evidence cleared.
    ///
    /// Returns true if the map was updated.
    pub fn update(
        &mut self,
        nav_cells: &[WorldCell],
        rock_cells: &[WorldCell],
        obs_cells: &[WorldCell],
        pitch_deg: f64,
        roll_deg: f64,
        gate: &AttitudeGate,
    ) -> bool {
        if !gate.is_open(pitch_deg, roll_deg) {
            trace!(
                "Map update gated out (pitch {:.3} deg, roll {:.3} deg)",
                pitch_deg,
                roll_deg
            );
            return false;
        }

        self.increment(nav_cells, MapLayer::Navigable);
        self.increment(rock_cells, MapLayer::Rock);
        self.increment(obs_cells, MapLayer::Obstacle);

        let obs = MapLayer::Obstacle.index();
        let rock = MapLayer::Rock.index();
        let nav = MapLayer::Navigable.index();

        for cell in nav_cells.iter().chain(rock_cells).chain(obs_cells) {
            if cell.x >= self.size() || cell.y >= self.size() {
                continue;
            }
            if self.data[[cell.y, cell.x, nav]] > 0 || self.data[[cell.y, cell.x, rock]] > 0 {
                self.data[[cell.y, cell.x, obs]] = 0;
            }
        }

        true
    }

    /// Count the cells with at least `min_confidence` of each kind of evidence.
    pub fn stats(&self, min_confidence: u8) -> MapStats {
        let min = min_confidence.max(1);
        let mut stats = MapStats::default();

        for cell in self.data.lanes(Axis(2)) {
            if cell[MapLayer::Navigable.index()] >= min {
                stats.navigable_cells += 1;
            }
            if cell[MapLayer::Rock.index()] >= min {
                stats.rock_cells += 1;
            }
            if cell[MapLayer::Obstacle.index()] >= min {
                stats.obstacle_cells += 1;
            }
        }

        stats
    }

    /// Compare the map with a ground truth mask of navigable terrain.
    ///
    /// The mask is indexed the same way as the map, pixel `(x, y)` being cell `(x, y)`, with any
    /// non-zero pixel being navigable. A cell counts as mapped navigable when its navigable
    /// counter is at least `min_confidence` and no smaller than its obstacle counter.
    pub fn fidelity(
        &self,
        ground_truth: &GrayImage,
        min_confidence: u8,
    ) -> Result<Fidelity, MapError> {
        let size = self.size();
        if ground_truth.width() as usize != size || ground_truth.height() as usize != size {
            return Err(MapError::GroundTruthShape(
                ground_truth.width(),
                ground_truth.height(),
                size,
            ));
        }

        let min = min_confidence.max(1);
        let mut true_nav = 0usize;
        let mut mapped_nav = 0usize;
        let mut good_nav = 0usize;

        for (x, y, px) in ground_truth.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let is_true = px.0[0] != 0;
            let nav = self.data[[y, x, MapLayer::Navigable.index()]];
            let obs = self.data[[y, x, MapLayer::Obstacle.index()]];
            let is_mapped = nav >= min && nav >= obs;

            true_nav += is_true as usize;
            mapped_nav += is_mapped as usize;
            good_nav += (is_true && is_mapped) as usize;
        }

        let percent = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                100.0 * num as f64 / den as f64
            }
        };

        Ok(Fidelity {
            percent_mapped: percent(good_nav, true_nav),
            fidelity: percent(good_nav, mapped_nav),
        })
    }

    /// Render the map for display.
    ///
    /// Red is obstacle, green rock and blue navigable evidence. The image is flipped so that the
    /// world's y axis points up.
    pub fn to_image(&self) -> RgbImage {
        let size = self.size() as u32;

        RgbImage::from_fn(size, size, |x, row| {
            let y = (size - 1 - row) as usize;
            let x = x as usize;
            Rgb([
                self.data[[y, x, MapLayer::Obstacle.index()]],
                self.data[[y, x, MapLayer::Rock.index()]],
                self.data[[y, x, MapLayer::Navigable.index()]],
            ])
        })
    }

    fn increment(&mut self, cells: &[WorldCell], layer: MapLayer) {
        let l = layer.index();

        for cell in cells {
            if let Some(c) = self.data.get_mut([cell.y, cell.x, l]) {
                *c = c.saturating_add(1);
            }
        }
    }
}

impl TryFrom<Array3<u8>> for WorldMap {
    type Error = MapError;

    fn try_from(data: Array3<u8>) -> Result<Self, Self::Error> {
        Self::from_data(data)
    }
}

impl From<WorldMap> for Array3<u8> {
    fn from(map: WorldMap) -> Self {
        map.data
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn near_level(angle_deg: f64, tol_deg: f64) -> bool {
    angle_deg.abs() < tol_deg || (angle_deg - 360.0).abs() < tol_deg
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::Luma;

    fn cell(x: usize, y: usize) -> WorldCell {
        WorldCell { x, y }
    }

    #[test]
    fn test_update_increments() {
        let mut map = WorldMap::new(10);
        let gate = AttitudeGate::default();

        assert!(map.update(
            &[cell(1, 2), cell(1, 2)],
            &[cell(5, 5)],
            &[cell(7, 8)],
            0.0,
            0.0,
            &gate
        ));

        assert_eq!(map.get(cell(1, 2), MapLayer::Navigable), Some(2));
        assert_eq!(map.get(cell(5, 5), MapLayer::Rock), Some(1));
        assert_eq!(map.get(cell(7, 8), MapLayer::Obstacle), Some(1));
        assert_eq!(map.get(cell(2, 1), MapLayer::Navigable), Some(0));
        assert_eq!(map.get(cell(10, 0), MapLayer::Navigable), None);
    }

    #[test]
    fn test_counters_saturate() {
        let mut map = WorldMap::new(4);
        let gate = AttitudeGate::default();

        for _ in 0..300 {
            map.update(&[cell(0, 0)], &[], &[cell(3, 3)], 359.9, 1.0, &gate);
        }

        assert_eq!(map.get(cell(0, 0), MapLayer::Navigable), Some(255));
        assert_eq!(map.get(cell(3, 3), MapLayer::Obstacle), Some(255));
    }

    #[test]
    fn test_mutual_exclusion() {
        let mut map = WorldMap::new(10);
        let gate = AttitudeGate::default();

        // Build up obstacle evidence first
        for _ in 0..5 {
            map.update(&[], &[], &[cell(3, 3), cell(4, 4)], 0.0, 0.0, &gate);
        }
        assert_eq!(map.get(cell(3, 3), MapLayer::Obstacle), Some(5));

        // A single navigable sighting clears it, as does a rock sighting, even when reported in
        // the same tick as more obstacle evidence
        map.update(&[cell(3, 3)], &[cell(4, 4)], &[cell(3, 3), cell(4, 4)], 0.0, 0.0, &gate);
        assert_eq!(map.get(cell(3, 3), MapLayer::Obstacle), Some(0));
        assert_eq!(map.get(cell(4, 4), MapLayer::Obstacle), Some(0));

        // And obstacle evidence can no longer build up there
        map.update(&[], &[], &[cell(3, 3)], 0.0, 0.0, &gate);
        assert_eq!(map.get(cell(3, 3), MapLayer::Obstacle), Some(0));

        for y in 0..10 {
            for x in 0..10 {
                let c = cell(x, y);
                let obs = map.get(c, MapLayer::Obstacle).unwrap();
                let free = map.get(c, MapLayer::Navigable).unwrap() > 0
                    || map.get(c, MapLayer::Rock).unwrap() > 0;
                assert!(!(obs > 0 && free));
            }
        }
    }

    #[test]
    fn test_attitude_gate() {
        let mut map = WorldMap::new(10);
        let gate = AttitudeGate::default();
        let before = map.clone();

        assert!(!map.update(&[cell(1, 1)], &[cell(2, 2)], &[cell(3, 3)], 10.0, 0.0, &gate));
        assert!(!map.update(&[cell(1, 1)], &[], &[], 0.0, 5.0, &gate));
        assert!(!map.update(&[cell(1, 1)], &[], &[], 359.5, 0.0, &gate));
        assert_eq!(map, before);

        assert!(gate.is_open(0.2, 358.5));
        assert!(gate.is_open(359.8, 1.9));
        assert!(!gate.is_open(0.25, 0.0));
        assert!(!gate.is_open(0.0, 2.0));
    }

    #[test]
    fn test_stats_and_image() {
        let mut map = WorldMap::new(4);
        let gate = AttitudeGate::default();

        map.update(
            &[cell(0, 0), cell(0, 0), cell(1, 0)],
            &[cell(2, 3)],
            &[cell(3, 3)],
            0.0,
            0.0,
            &gate,
        );

        assert_eq!(
            map.stats(0),
            MapStats {
                navigable_cells: 2,
                rock_cells: 1,
                obstacle_cells: 1,
            }
        );
        assert_eq!(map.stats(2).navigable_cells, 1);

        let img = map.to_image();
        // World y = 0 is the bottom row of the image
        assert_eq!(*img.get_pixel(0, 3), Rgb([0, 0, 2]));
        assert_eq!(*img.get_pixel(2, 0), Rgb([0, 1, 0]));
        assert_eq!(*img.get_pixel(3, 0), Rgb([1, 0, 0]));
    }

    #[test]
    fn test_fidelity() {
        let mut map = WorldMap::new(4);
        let gate = AttitudeGate::default();
        map.update(&[cell(0, 0), cell(1, 0), cell(3, 3)], &[], &[], 0.0, 0.0, &gate);

        let mut truth = GrayImage::new(4, 4);
        truth.put_pixel(0, 0, Luma([1]));
        truth.put_pixel(1, 0, Luma([1]));
        truth.put_pixel(2, 0, Luma([1]));
        truth.put_pixel(3, 0, Luma([1]));

        let f = map.fidelity(&truth, 1).unwrap();
        assert!((f.percent_mapped - 50.0).abs() < 1e-9);
        assert!((f.fidelity - 200.0 / 3.0).abs() < 1e-9);

        assert!(matches!(
            map.fidelity(&GrayImage::new(3, 4), 1),
            Err(MapError::GroundTruthShape(3, 4, 4))
        ));
    }

    #[test]
    fn test_from_data() {
        let mut data = Array3::zeros((2, 2, 3));
        data[[0, 1, MapLayer::Obstacle.index()]] = 5;
        data[[0, 1, MapLayer::Navigable.index()]] = 7;
        data[[1, 0, MapLayer::Obstacle.index()]] = 3;

        let map = WorldMap::from_data(data).unwrap();

        // Overlapping obstacle evidence is cleared, lone obstacles are kept
        assert_eq!(map.get(cell(1, 0), MapLayer::Obstacle), Some(0));
        assert_eq!(map.get(cell(1, 0), MapLayer::Navigable), Some(7));
        assert_eq!(map.get(cell(0, 1), MapLayer::Obstacle), Some(3));

        assert!(matches!(
            WorldMap::from_data(Array3::zeros((2, 1, 3))),
            Err(MapError::DataShape(_))
        ));
        assert!(matches!(
            WorldMap::from_data(Array3::zeros((2, 2, 4))),
            Err(MapError::DataShape(_))
        ));
    }

    #[test]
    fn test_deserialise_checks_data() {
        let map: WorldMap =
            util::params::from_toml_str("v = 1\ndim = [1, 1, 3]\ndata = [5, 0, 7]").unwrap();

        assert_eq!(map.size(), 1);
        assert_eq!(map.get(cell(0, 0), MapLayer::Obstacle), Some(0));
        assert_eq!(map.get(cell(0, 0), MapLayer::Navigable), Some(7));

        let non_square = util::params::from_toml_str::<WorldMap>(
            "v = 1\ndim = [2, 1, 3]\ndata = [0, 0, 0, 0, 0, 0]",
        );
        assert!(non_square.is_err());
    }
}
