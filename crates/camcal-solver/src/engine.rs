use crate::distortion::{fit_distortion, BrownConrady, DistortionFitOptions, DistortionView};
use crate::homography::{conditioning, estimate_homography};
use crate::zhang::{estimate_intrinsics, MIN_VIEWS};
use crate::CalibrateError;
use camcal_core::{BoardGeometry, CalibrationEngine, CalibrationResult, SampleSet};
use log::{debug, info};
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Settings for [`ZhangCalibrationEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZhangParams {
    /// Distortion → K alternations after the initial distortion-free estimate.
    pub refine_rounds: usize,
    /// Fixed-point iterations when undistorting observations.
    pub undistort_iters: u32,
    #[serde(flatten)]
    pub distortion: DistortionFitOptions,
}

impl Default for ZhangParams {
    fn default() -> Self {
        Self {
            refine_rounds: 3,
            undistort_iters: 10,
            distortion: DistortionFitOptions::default(),
        }
    }
}

/// Rigid board → camera transform of one view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewPose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl ViewPose {
    /// Decompose `H = K [r1 r2 t]` given `K⁻¹`.
    ///
    /// The rotation is projected onto SO(3) and the board is kept in front of
    /// the camera.
    pub fn from_homography(k_inv: &Matrix3<f64>, h: &Matrix3<f64>) -> Option<Self> {
        let h1 = k_inv * h.column(0);
        let h2 = k_inv * h.column(1);
        let h3 = k_inv * h.column(2);

        let scale = 0.5 * (h1.norm() + h2.norm());
        if scale < 1e-12 {
            return None;
        }
        let mut lambda = 1.0 / scale;
        if h3.z < 0.0 {
            lambda = -lambda;
        }

        let r1 = h1 * lambda;
        let r2 = h2 * lambda;
        let r3 = r1.cross(&r2);
        let r = Matrix3::from_columns(&[r1, r2, r3]);

        let svd = r.svd(true, true);
        let (u, v_t) = (svd.u?, svd.v_t?);
        let mut rotation = u * v_t;
        if rotation.determinant() < 0.0 {
            let mut u = u;
            u.column_mut(2).neg_mut();
            rotation = u * v_t;
        }

        Some(Self {
            rotation,
            translation: h3 * lambda,
        })
    }

    /// Board point expressed in camera coordinates.
    pub fn transform(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.rotation * p.coords + self.translation
    }
}

/// Project a camera-frame point through distortion and `K`.
pub fn project(
    k: &Matrix3<f64>,
    distortion: &BrownConrady,
    pc: &Vector3<f64>,
) -> Option<Point2<f64>> {
    if pc.z.abs() < 1e-12 {
        return None;
    }
    let d = distortion.distort(Vector2::new(pc.x / pc.z, pc.y / pc.z));
    let p = k * Vector3::new(d.x, d.y, 1.0);
    Some(Point2::new(p.x / p.z, p.y / p.z))
}

/// Full output of the planar solver, before flattening into a
/// [`CalibrationResult`].
#[derive(Clone, Debug)]
pub struct PlanarCalibration {
    pub camera_matrix: Matrix3<f64>,
    pub distortion: BrownConrady,
    pub poses: Vec<ViewPose>,
    /// RMS reprojection error over all points, in pixels.
    pub rms: f64,
}

impl From<&PlanarCalibration> for CalibrationResult {
    fn from(c: &PlanarCalibration) -> Self {
        CalibrationResult::new(c.camera_matrix, c.distortion.to_opencv()).with_rms(c.rms)
    }
}

/// Pure-Rust calibration engine: DLT homographies, Zhang's closed form with
/// zero skew, and alternating linear distortion refinement.
#[derive(Clone, Debug, Default)]
pub struct ZhangCalibrationEngine {
    pub params: ZhangParams,
}

impl ZhangCalibrationEngine {
    pub fn new(params: ZhangParams) -> Self {
        Self { params }
    }

    /// Calibrate from per-view image points of `board`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, views, board), fields(num_views = views.len()))
    )]
    pub fn solve(
        &self,
        views: &[Vec<Point2<f64>>],
        board: &BoardGeometry,
    ) -> Result<PlanarCalibration, CalibrateError> {
        if views.len() < MIN_VIEWS {
            return Err(CalibrateError::NotEnoughViews {
                have: views.len(),
                need: MIN_VIEWS,
            });
        }
        let expected = board.corner_count();
        for (view, pts) in views.iter().enumerate() {
            if pts.len() != expected {
                return Err(CalibrateError::PointCountMismatch {
                    view,
                    expected,
                    got: pts.len(),
                });
            }
        }

        let object = board.object_points();
        let plane: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let cond = conditioning(views.iter().flatten());

        let mut homographies = view_homographies(&plane, views)?;
        let mut k = estimate_intrinsics(&homographies, &cond)?;
        let mut distortion = BrownConrady::default();
        debug!(
            "initial intrinsics fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
            k[(0, 0)],
            k[(1, 1)],
            k[(0, 2)],
            k[(1, 2)]
        );

        for round in 0..self.params.refine_rounds {
            let dist_views: Vec<DistortionView<'_>> = homographies
                .iter()
                .zip(views)
                .map(|(h, pixels)| DistortionView {
                    homography: *h,
                    board: &plane,
                    pixels: pixels.as_slice(),
                })
                .collect();
            distortion = fit_distortion(&k, &dist_views, self.params.distortion)?;

            let undistorted = self.undistort_views(&k, &distortion, views)?;
            homographies = view_homographies(&plane, &undistorted)?;
            k = estimate_intrinsics(&homographies, &cond)?;
            debug!(
                "round {}: fx={:.2} fy={:.2} k1={:.4} k2={:.4}",
                round + 1,
                k[(0, 0)],
                k[(1, 1)],
                distortion.k1,
                distortion.k2
            );
        }

        // Poses come from homographies consistent with the final K.
        if self.params.refine_rounds > 0 {
            let undistorted = self.undistort_views(&k, &distortion, views)?;
            homographies = view_homographies(&plane, &undistorted)?;
        }
        let k_inv = k
            .try_inverse()
            .ok_or(CalibrateError::DegenerateIntrinsics("singular camera matrix"))?;
        let poses = homographies
            .iter()
            .map(|h| ViewPose::from_homography(&k_inv, h))
            .collect::<Option<Vec<_>>>()
            .ok_or(CalibrateError::DegenerateIntrinsics("pose recovery failed"))?;

        let rms = reprojection_rms(&k, &distortion, &poses, &object, views);
        info!(
            "calibrated from {} views: fx={:.2} fy={:.2} cx={:.2} cy={:.2} rms={:.4}px",
            views.len(),
            k[(0, 0)],
            k[(1, 1)],
            k[(0, 2)],
            k[(1, 2)],
            rms
        );

        Ok(PlanarCalibration {
            camera_matrix: k,
            distortion,
            poses,
            rms,
        })
    }

    fn undistort_views(
        &self,
        k: &Matrix3<f64>,
        distortion: &BrownConrady,
        views: &[Vec<Point2<f64>>],
    ) -> Result<Vec<Vec<Point2<f64>>>, CalibrateError> {
        let k_inv = k
            .try_inverse()
            .ok_or(CalibrateError::DegenerateIntrinsics("singular camera matrix"))?;
        Ok(views
            .iter()
            .map(|pts| {
                pts.iter()
                    .map(|p| distortion.undistort_pixel(k, &k_inv, p, self.params.undistort_iters))
                    .collect()
            })
            .collect())
    }
}

impl CalibrationEngine for ZhangCalibrationEngine {
    type Error = CalibrateError;

    fn calibrate(
        &mut self,
        samples: &SampleSet,
        board: &BoardGeometry,
    ) -> Result<CalibrationResult, CalibrateError> {
        let views: Vec<Vec<Point2<f64>>> = samples
            .image_points()
            .map(|pts| {
                pts.iter()
                    .map(|p| Point2::new(p.x as f64, p.y as f64))
                    .collect()
            })
            .collect();
        let solution = self.solve(&views, board)?;
        Ok(CalibrationResult::from(&solution))
    }
}

fn view_homographies(
    plane: &[Point2<f64>],
    views: &[Vec<Point2<f64>>],
) -> Result<Vec<Matrix3<f64>>, CalibrateError> {
    views
        .iter()
        .enumerate()
        .map(|(view, pixels)| {
            estimate_homography(plane, pixels).ok_or(CalibrateError::HomographyFailed { view })
        })
        .collect()
}

/// Root-mean-square pixel distance between observations and reprojections.
pub fn reprojection_rms(
    k: &Matrix3<f64>,
    distortion: &BrownConrady,
    poses: &[ViewPose],
    object: &[Point3<f64>],
    views: &[Vec<Point2<f64>>],
) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (pose, pixels) in poses.iter().zip(views) {
        for (obj, obs) in object.iter().zip(pixels) {
            let Some(p) = project(k, distortion, &pose.transform(obj)) else {
                continue;
            };
            sum += (p.coords - obs.coords).norm_squared();
            count += 1;
        }
    }
    if count == 0 {
        return f64::INFINITY;
    }
    (sum / count as f64).sqrt()
}
