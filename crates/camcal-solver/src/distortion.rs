//! Brown-Conrady lens distortion and its linear least-squares fit.
//!
//! The fit compares observed (distorted) pixels with the pinhole prediction
//! of a per-view homography, both moved to normalized camera coordinates by
//! `K⁻¹`. For a small distortion the residual is linear in the
//! coefficients:
//!
//! ```text
//! dx = x (k1 r² + k2 r⁴ + k3 r⁶) + 2 p1 x y + p2 (r² + 2 x²)
//! dy = y (k1 r² + k2 r⁴ + k3 r⁶) + p1 (r² + 2 y²) + 2 p2 x y
//! ```

use crate::{homography, CalibrateError};
use camcal_core::DISTORTION_LEN;
use nalgebra::{DMatrix, DVector, Matrix3, Point2, SVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Radial (k1, k2, k3) and tangential (p1, p2) distortion coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady {
    /// Apply distortion to a normalized point.
    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        Vector2::new(
            x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }

    /// Invert [`Self::distort`] by fixed-point iteration.
    pub fn undistort(&self, d: Vector2<f64>, iters: u32) -> Vector2<f64> {
        let mut n = d;
        for _ in 0..iters {
            let (x, y) = (n.x, n.y);
            let r2 = x * x + y * y;
            let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
            if radial.abs() < 1e-12 {
                break;
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            n = Vector2::new((d.x - dx) / radial, (d.y - dy) / radial);
        }
        n
    }

    /// Undistort a pixel observation under intrinsics `k` (and its inverse).
    pub fn undistort_pixel(
        &self,
        k: &Matrix3<f64>,
        k_inv: &Matrix3<f64>,
        p: &Point2<f64>,
        iters: u32,
    ) -> Point2<f64> {
        let v = k_inv * Vector3::new(p.x, p.y, 1.0);
        let n = self.undistort(Vector2::new(v.x / v.z, v.y / v.z), iters);
        let q = k * Vector3::new(n.x, n.y, 1.0);
        Point2::new(q.x / q.z, q.y / q.z)
    }

    /// Coefficients in OpenCV's 8-element order `(k1, k2, p1, p2, k3, k4, k5, k6)`.
    pub fn to_opencv(&self) -> SVector<f64, DISTORTION_LEN> {
        let mut out = SVector::<f64, DISTORTION_LEN>::zeros();
        out[0] = self.k1;
        out[1] = self.k2;
        out[2] = self.p1;
        out[3] = self.p2;
        out[4] = self.k3;
        out
    }
}

/// Which coefficients the linear fit estimates.
///
/// `k3` is held at zero by default: with the moderate field of view of a
/// webcam the sixth-order term is barely constrained and absorbs noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionFitOptions {
    /// Keep `p1 = p2 = 0`.
    pub fix_tangential: bool,
    /// Keep `k3 = 0`.
    pub fix_k3: bool,
}

impl Default for DistortionFitOptions {
    fn default() -> Self {
        Self {
            fix_tangential: false,
            fix_k3: true,
        }
    }
}

/// One view for the distortion fit.
#[derive(Clone, Copy, Debug)]
pub struct DistortionView<'a> {
    /// Board plane → undistorted pixels.
    pub homography: Matrix3<f64>,
    /// Board coordinates on `Z = 0`.
    pub board: &'a [Point2<f64>],
    /// Observed, distorted pixels.
    pub pixels: &'a [Point2<f64>],
}

/// Fit distortion coefficients given intrinsics `k` and per-view homographies.
pub fn fit_distortion(
    k: &Matrix3<f64>,
    views: &[DistortionView<'_>],
    opts: DistortionFitOptions,
) -> Result<BrownConrady, CalibrateError> {
    let n_params = 2 + usize::from(!opts.fix_k3) + 2 * usize::from(!opts.fix_tangential);
    let total: usize = views.iter().map(|v| v.board.len().min(v.pixels.len())).sum();
    if 2 * total <= n_params {
        return Err(CalibrateError::DistortionFit("not enough points"));
    }

    let k_inv = k
        .try_inverse()
        .ok_or(CalibrateError::DistortionFit("intrinsics not invertible"))?;
    let normalize = |p: &Point2<f64>| {
        let v = k_inv * Vector3::new(p.x, p.y, 1.0);
        Vector2::new(v.x / v.z, v.y / v.z)
    };

    let mut a = DMatrix::<f64>::zeros(2 * total, n_params);
    let mut b = DVector::<f64>::zeros(2 * total);
    let mut row = 0;
    let mut max_r2 = 0.0f64;

    for view in views {
        for (board, pixel) in view.board.iter().zip(view.pixels) {
            let ideal = homography::apply(&view.homography, board)
                .ok_or(CalibrateError::DistortionFit("board point maps to infinity"))?;
            let n_ideal = normalize(&ideal);
            let residual = normalize(pixel) - n_ideal;

            let (x, y) = (n_ideal.x, n_ideal.y);
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            max_r2 = max_r2.max(r2);

            let mut col = 0;
            a[(row, col)] = x * r2;
            a[(row + 1, col)] = y * r2;
            col += 1;
            a[(row, col)] = x * r4;
            a[(row + 1, col)] = y * r4;
            col += 1;
            if !opts.fix_k3 {
                a[(row, col)] = x * r4 * r2;
                a[(row + 1, col)] = y * r4 * r2;
                col += 1;
            }
            if !opts.fix_tangential {
                a[(row, col)] = 2.0 * x * y;
                a[(row + 1, col)] = r2 + 2.0 * y * y;
                a[(row, col + 1)] = r2 + 2.0 * x * x;
                a[(row + 1, col + 1)] = 2.0 * x * y;
            }

            b[row] = residual.x;
            b[row + 1] = residual.y;
            row += 2;
        }
    }

    if max_r2 < 1e-6 {
        return Err(CalibrateError::DistortionFit(
            "all points near the principal point",
        ));
    }

    let x = a
        .svd(true, true)
        .solve(&b, 1e-10)
        .map_err(|_| CalibrateError::DistortionFit("svd failed"))?;

    let mut coeffs = x.iter().copied();
    let mut next = || coeffs.next().unwrap_or(0.0);
    let k1 = next();
    let k2 = next();
    let k3 = if opts.fix_k3 { 0.0 } else { next() };
    let (p1, p2) = if opts.fix_tangential {
        (0.0, 0.0)
    } else {
        (next(), next())
    };

    Ok(BrownConrady { k1, k2, p1, p2, k3 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn undistort_inverts_distort() {
        let d = BrownConrady {
            k1: -0.21,
            k2: 0.05,
            p1: 0.001,
            p2: -0.0015,
            k3: 0.0,
        };
        for &(x, y) in &[(0.0, 0.0), (0.3, -0.2), (-0.4, 0.25), (0.1, 0.45)] {
            let n = Vector2::new(x, y);
            let back = d.undistort(d.distort(n), 20);
            assert_abs_diff_eq!(back.x, x, epsilon = 1e-7);
            assert_abs_diff_eq!(back.y, y, epsilon = 1e-7);
        }
    }

    #[test]
    fn opencv_order() {
        let d = BrownConrady {
            k1: 1.0,
            k2: 2.0,
            p1: 3.0,
            p2: 4.0,
            k3: 5.0,
        };
        let v = d.to_opencv();
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn recovers_radial_coefficients() {
        let k = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let gt = BrownConrady {
            k1: -0.15,
            k2: 0.03,
            ..Default::default()
        };
        // Fronto-parallel board: H maps board units straight to pixels.
        let h = Matrix3::new(1000.0, 0.0, 20.0, 0.0, 1000.0, 10.0, 0.0, 0.0, 1.0);
        let board: Vec<Point2<f64>> = (0..10)
            .flat_map(|j| (0..13).map(move |i| Point2::new(i as f64 * 0.05, j as f64 * 0.05)))
            .collect();
        let k_inv = k.try_inverse().unwrap();
        let pixels: Vec<Point2<f64>> = board
            .iter()
            .map(|b| {
                let ideal = homography::apply(&h, b).unwrap();
                let v = k_inv * Vector3::new(ideal.x, ideal.y, 1.0);
                let d = gt.distort(Vector2::new(v.x, v.y));
                let p = k * Vector3::new(d.x, d.y, 1.0);
                Point2::new(p.x, p.y)
            })
            .collect();

        let views = [DistortionView {
            homography: h,
            board: &board,
            pixels: &pixels,
        }];
        let fit = fit_distortion(
            &k,
            &views,
            DistortionFitOptions::default(),
        )
        .expect("fit");
        assert_abs_diff_eq!(fit.k1, gt.k1, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.k2, gt.k2, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.p1, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.k3, 0.0);
    }

    #[test]
    fn centered_points_are_degenerate() {
        let k = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let board = vec![Point2::new(320.0, 240.0); 8];
        let views = [DistortionView {
            homography: Matrix3::identity(),
            board: &board,
            pixels: &board,
        }];
        assert!(fit_distortion(&k, &views, DistortionFitOptions::default()).is_err());
    }

    #[test]
    fn k3_is_held_by_default() {
        let opts = DistortionFitOptions::default();
        assert!(opts.fix_k3);
        assert!(!opts.fix_tangential);

        let parsed: DistortionFitOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, opts);
    }
}
