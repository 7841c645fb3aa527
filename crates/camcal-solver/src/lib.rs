//! Planar camera calibration from chessboard views.
//!
//! Pipeline:
//! 1. per-view homography board plane → pixels (normalized DLT),
//! 2. Zhang's closed-form intrinsics with skew fixed to zero,
//! 3. linear Brown-Conrady distortion fit, undistortion and re-estimation of
//!    the homographies and `K`, repeated [`ZhangParams::refine_rounds`] times,
//! 4. per-view poses and the RMS reprojection error.
//!
//! ## Quickstart
//!
//! ```
//! use camcal_core::{BoardGeometry, CalibrationEngine, SampleSet};
//! use camcal_solver::{CalibrateError, ZhangCalibrationEngine};
//!
//! let board = BoardGeometry::default();
//! let mut engine = ZhangCalibrationEngine::default();
//! let err = engine.calibrate(&SampleSet::new(board), &board).unwrap_err();
//! assert!(matches!(err, CalibrateError::NotEnoughViews { have: 0, .. }));
//! ```

mod distortion;
mod engine;
mod error;
mod homography;
mod zhang;

pub use distortion::{fit_distortion, BrownConrady, DistortionFitOptions, DistortionView};
pub use engine::{
    project, reprojection_rms, PlanarCalibration, ViewPose, ZhangCalibrationEngine, ZhangParams,
};
pub use error::CalibrateError;
pub use homography::{apply as apply_homography, conditioning, estimate_homography};
pub use zhang::{estimate_intrinsics, MIN_VIEWS};
