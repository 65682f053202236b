//! # Colour classification
//!
//! Splits a rectified camera image into navigable terrain, rock sample and obstacle masks. Masks
//! are single channel images where set pixels hold 1.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Bright ground is navigable.
pub const NAV_THRESH: ColorThresh = ColorThresh {
    lower: [160, 160, 160],
    upper: [255, 255, 255],
};

/// Rock samples are a narrow yellow band.
pub const ROCK_THRESH: ColorThresh = ColorThresh {
    lower: [120, 100, 0],
    upper: [200, 200, 50],
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An inclusive RGB threshold band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorThresh {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

/// The three terrain masks produced from a single rectified image.
#[derive(Debug, Clone)]
pub struct TerrainMasks {
    pub navigable: GrayImage,
    pub rock: GrayImage,
    pub obstacle: GrayImage,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ColorThresh {
    /// Returns true if every channel of the pixel is within the band.
    pub fn contains(&self, px: &Rgb<u8>) -> bool {
        px.0.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(c, (lo, hi))| c >= lo && c <= hi)
    }
}

impl TerrainMasks {
    /// Build the display overlay of the masks.
    ///
    /// Channel 0 is obstacle, channel 1 rock and channel 2 navigable, with set pixels at 255.
    pub fn overlay(&self) -> RgbImage {
        RgbImage::from_fn(self.navigable.width(), self.navigable.height(), |x, y| {
            Rgb([
                self.obstacle.get_pixel(x, y).0[0].saturating_mul(255),
                self.rock.get_pixel(x, y).0[0].saturating_mul(255),
                self.navigable.get_pixel(x, y).0[0].saturating_mul(255),
            ])
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Threshold the image, setting every pixel whose channels all lie within `[lower, upper]`.
pub fn classify(image: &RgbImage, lower: [u8; 3], upper: [u8; 3]) -> GrayImage {
    let thresh = ColorThresh { lower, upper };

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([thresh.contains(image.get_pixel(x, y)) as u8])
    })
}

/// Classify a rectified image into navigable, rock and obstacle masks.
///
/// The obstacle mask is the complement of the navigable mask, except that pixels with a zero red
/// channel are outside the rectified field of view and are never obstacles.
pub fn classify_terrain(image: &RgbImage, nav: &ColorThresh, rock: &ColorThresh) -> TerrainMasks {
    let navigable = classify(image, nav.lower, nav.upper);
    let rock = classify(image, rock.lower, rock.upper);

    let obstacle = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let unseen = image.get_pixel(x, y).0[0] == 0;
        let free = navigable.get_pixel(x, y).0[0] != 0;
        Luma([(!unseen && !free) as u8])
    });

    TerrainMasks {
        navigable,
        rock,
        obstacle,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify_inclusive_bounds() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, Rgb([160, 160, 160]));
        img.put_pixel(1, 0, Rgb([159, 200, 200]));
        img.put_pixel(2, 0, Rgb([255, 255, 255]));
        img.put_pixel(3, 0, Rgb([200, 160, 159]));

        let mask = classify(&img, NAV_THRESH.lower, NAV_THRESH.upper);

        let set: Vec<u8> = mask.pixels().map(|p| p.0[0]).collect();
        assert_eq!(set, vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_classify_rock() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([150, 140, 20]));
        img.put_pixel(1, 0, Rgb([150, 140, 51]));
        img.put_pixel(2, 0, Rgb([119, 140, 20]));

        let mask = classify(&img, ROCK_THRESH.lower, ROCK_THRESH.upper);

        let set: Vec<u8> = mask.pixels().map(|p| p.0[0]).collect();
        assert_eq!(set, vec![1, 0, 0]);
    }

    #[test]
    fn test_classify_terrain() {
        let mut img = RgbImage::new(4, 1);
        // Navigable ground
        img.put_pixel(0, 0, Rgb([200, 190, 180]));
        // Dark rock face
        img.put_pixel(1, 0, Rgb([90, 70, 60]));
        // Outside the field of view
        img.put_pixel(2, 0, Rgb([0, 0, 0]));
        // Rock sample
        img.put_pixel(3, 0, Rgb([150, 140, 20]));

        let masks = classify_terrain(&img, &NAV_THRESH, &ROCK_THRESH);

        let nav: Vec<u8> = masks.navigable.pixels().map(|p| p.0[0]).collect();
        let rock: Vec<u8> = masks.rock.pixels().map(|p| p.0[0]).collect();
        let obs: Vec<u8> = masks.obstacle.pixels().map(|p| p.0[0]).collect();

        assert_eq!(nav, vec![1, 0, 0, 0]);
        assert_eq!(rock, vec![0, 0, 0, 1]);
        assert_eq!(obs, vec![0, 1, 0, 1]);

        // Navigable and obstacle never overlap
        for (n, o) in nav.iter().zip(obs.iter()) {
            assert!(!(*n == 1 && *o == 1));
        }
    }

    #[test]
    fn test_overlay() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([200, 190, 180]));
        img.put_pixel(1, 0, Rgb([150, 140, 20]));

        let overlay = classify_terrain(&img, &NAV_THRESH, &ROCK_THRESH).overlay();

        assert_eq!(*overlay.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*overlay.get_pixel(1, 0), Rgb([255, 255, 0]));
    }
}
