//! # Perspective warp
//!
//! Rectifies the forward camera image into a top down view. A trapezoid of ground in the camera
//! image, calibrated once against a grid of known size, is mapped onto a square at the bottom
//! centre of the output image. The output therefore has a fixed number of pixels per world unit.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{Rgb, RgbImage};
use log::debug;
use nalgebra::{Matrix3, MatrixN, Vector3, VectorN, U8};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Minimum area of the triangle formed by any three calibration points.
///
/// Units: pixels^2
const MIN_TRIANGLE_AREA_PX2: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A projective transform from the camera image to the rectified image.
#[derive(Debug, Clone)]
pub struct PerspectiveWarp {
    /// Homography taking source image points to destination points
    h: Matrix3<f64>,

    /// Inverse homography, used to resample the source image
    h_inv: Matrix3<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
pub enum WarpError {
    #[error("The perspective calibration is degenerate: {0}")]
    Degenerate(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PerspectiveWarp {
    /// Compute the transform mapping each of the `src` points onto the matching `dst` point.
    ///
    /// Fails if three of the points on either side are collinear, in which case there is no
    /// unique transform.
    pub fn new(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Result<Self, WarpError> {
        if is_degenerate(src) {
            return Err(WarpError::Degenerate("three source points are collinear"));
        }
        if is_degenerate(dst) {
            return Err(WarpError::Degenerate("three destination points are collinear"));
        }

        // Build the linear system for the 8 unknowns of the homography, with h33 fixed at 1.
        let mut a = MatrixN::<f64, U8>::zeros();
        let mut b = VectorN::<f64, U8>::zeros();

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (x, y) = (s[0], s[1]);
            let (u, v) = (d[0], d[1]);
            let r = 2 * i;

            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -x * u;
            a[(r, 7)] = -y * u;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -x * v;
            a[(r + 1, 7)] = -y * v;
            b[r + 1] = v;
        }

        let sol = a
            .lu()
            .solve(&b)
            .ok_or(WarpError::Degenerate("the correspondence system is singular"))?;

        let h = Matrix3::new(
            sol[0], sol[1], sol[2], sol[3], sol[4], sol[5], sol[6], sol[7], 1.0,
        );

        if h.iter().any(|v| !v.is_finite()) {
            return Err(WarpError::Degenerate("the homography is not finite"));
        }

        let h_inv = h
            .try_inverse()
            .ok_or(WarpError::Degenerate("the homography is not invertible"))?;

        debug!("Perspective homography: {}", h);

        Ok(Self { h, h_inv })
    }

    /// Build the transform from the calibrated source trapezoid onto a square of side `dst_size`
    /// pixels sitting on the bottom centre of an image of the given size.
    ///
    /// The source points must be ordered bottom left, bottom right, top right, top left.
    pub fn from_calibration(
        src: &[[f64; 2]; 4],
        image_width: u32,
        image_height: u32,
        dst_size: f64,
    ) -> Result<Self, WarpError> {
        let base_x = 0.5 * image_width as f64;
        let base_y = image_height as f64;
        let half = 0.5 * dst_size;

        let dst = [
            [base_x - half, base_y],
            [base_x + half, base_y],
            [base_x + half, base_y - dst_size],
            [base_x - half, base_y - dst_size],
        ];

        Self::new(src, &dst)
    }

    /// Map a point from the source image into the rectified image.
    ///
    /// Returns `None` for points on the source image's horizon line.
    pub fn project(&self, point: [f64; 2]) -> Option<[f64; 2]> {
        apply_homography(&self.h, point)
    }

    /// Resample the image through the transform.
    ///
    /// The output has the same size as the input. Output pixels whose source lies outside the
    /// input image are black. This includes sources less than a pixel beyond the edge, which are
    /// not blended with a black border, so the edge of the field of view has no dark fringe.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let max_x = image.width() as f64 - 1.0;
        let max_y = image.height() as f64 - 1.0;

        RgbImage::from_fn(image.width(), image.height(), |x, y| {
            match apply_homography(&self.h_inv, [x as f64, y as f64]) {
                Some([sx, sy]) if sx >= 0.0 && sy >= 0.0 && sx <= max_x && sy <= max_y => {
                    sample_bilinear(image, sx, sy)
                }
                _ => Rgb([0, 0, 0]),
            }
        })
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns true if any three of the points are collinear.
fn is_degenerate(points: &[[f64; 2]; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];

    TRIPLES.iter().any(|t| {
        let [a, b, c] = [points[t[0]], points[t[1]], points[t[2]]];
        let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
        0.5 * cross.abs() < MIN_TRIANGLE_AREA_PX2
    })
}

fn apply_homography(h: &Matrix3<f64>, point: [f64; 2]) -> Option<[f64; 2]> {
    let p = h * Vector3::new(point[0], point[1], 1.0);

    if p.z.abs() < std::f64::EPSILON {
        return None;
    }

    Some([p.x / p.z, p.y / p.z])
}

/// Bilinear sample of the image at a point inside its bounds.
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for (c, o) in out.iter_mut().enumerate() {
        let top = p00.0[c] as f64 * (1.0 - fx) + p10.0[c] as f64 * fx;
        let bottom = p01.0[c] as f64 * (1.0 - fx) + p11.0[c] as f64 * fx;
        *o = (top * (1.0 - fy) + bottom * fy).round().max(0.0).min(255.0) as u8;
    }

    Rgb(out)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Calibration of the rover's forward camera against a 1 m grid
    const SRC: [[f64; 2]; 4] = [[13.0, 139.0], [302.0, 139.0], [200.0, 94.0], [120.0, 94.0]];

    #[test]
    fn test_calibration_points_map_to_square() {
        let warp = PerspectiveWarp::from_calibration(&SRC, 320, 160, 10.0).unwrap();

        let expected = [[155.0, 160.0], [165.0, 160.0], [165.0, 150.0], [155.0, 150.0]];

        for (s, e) in SRC.iter().zip(expected.iter()) {
            let p = warp.project(*s).unwrap();
            assert!((p[0] - e[0]).abs() < 1e-6, "{:?} -> {:?}", s, p);
            assert!((p[1] - e[1]).abs() < 1e-6, "{:?} -> {:?}", s, p);
        }
    }

    #[test]
    fn test_identity() {
        let pts = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let warp = PerspectiveWarp::new(&pts, &pts).unwrap();

        let mut img = RgbImage::new(8, 8);
        img.put_pixel(3, 5, Rgb([10, 20, 30]));

        assert_eq!(warp.apply(&img), img);
    }

    #[test]
    fn test_apply_fills_unseen_with_black() {
        let warp = PerspectiveWarp::from_calibration(&SRC, 320, 160, 10.0).unwrap();
        let img = RgbImage::from_pixel(320, 160, Rgb([255, 255, 255]));

        let warped = warp.apply(&img);

        // Inside the calibration square, in view
        assert_eq!(*warped.get_pixel(160, 155), Rgb([255, 255, 255]));

        // Far to the side at the bottom of the image, outside the camera's view
        assert_eq!(*warped.get_pixel(0, 159), Rgb([0, 0, 0]));
        assert_eq!(*warped.get_pixel(319, 159), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_apply_sub_pixel_edge_is_unseen() {
        let src = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let dst = [[0.5, 0.0], [10.5, 0.0], [10.5, 10.0], [0.5, 10.0]];
        let warp = PerspectiveWarp::new(&src, &dst).unwrap();

        let img = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let warped = warp.apply(&img);

        // Column 0 samples half a pixel left of the image, which is not blended with the border
        assert_eq!(*warped.get_pixel(0, 4), Rgb([0, 0, 0]));
        assert_eq!(*warped.get_pixel(1, 4), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_degenerate_calibration() {
        let collinear = [[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [5.0, 10.0]];
        let square = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];

        assert!(matches!(
            PerspectiveWarp::new(&collinear, &square),
            Err(WarpError::Degenerate(_))
        ));
        assert!(matches!(
            PerspectiveWarp::new(&square, &collinear),
            Err(WarpError::Degenerate(_))
        ));
        assert!(matches!(
            PerspectiveWarp::from_calibration(&SRC, 320, 160, 0.0),
            Err(WarpError::Degenerate(_))
        ));
    }
}
