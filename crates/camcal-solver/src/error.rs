use thiserror::Error;

/// Errors returned by the planar calibration pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrateError {
    #[error("need at least {need} views, got {have}")]
    NotEnoughViews { have: usize, need: usize },
    #[error("view {view}: expected {expected} points, got {got}")]
    PointCountMismatch {
        view: usize,
        expected: usize,
        got: usize,
    },
    #[error("homography estimation failed for view {view}")]
    HomographyFailed { view: usize },
    #[error("degenerate intrinsics: {0}")]
    DegenerateIntrinsics(&'static str),
    #[error("distortion fit failed: {0}")]
    DistortionFit(&'static str),
}
