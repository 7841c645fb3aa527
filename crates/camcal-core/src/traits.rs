//! Seams between the capture session and its collaborators.

use crate::{BoardGeometry, CalibrationResult, DetectedPattern, Frame, SampleSet};
use std::time::Duration;

/// Error raised by a display backend. Display failures end the session.
#[derive(thiserror::Error, Debug)]
#[error("display: {0}")]
pub struct DisplayError(pub String);

/// A sequence of frames, usually a camera.
pub trait FrameSource {
    /// Next frame, or `None` once the device is closed or a read fails.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Locates the board's inner corners in a frame.
pub trait PatternDetector {
    fn detect(&mut self, frame: &Frame, board: &BoardGeometry) -> DetectedPattern;
}

/// Solves intrinsics and distortion from confirmed views.
pub trait CalibrationEngine {
    type Error: std::error::Error + 'static;

    fn calibrate(
        &mut self,
        samples: &SampleSet,
        board: &BoardGeometry,
    ) -> Result<CalibrationResult, Self::Error>;
}

/// Live preview window plus keyboard polling.
pub trait Display {
    fn show(&mut self, frame: &Frame, pattern: &DetectedPattern) -> Result<(), DisplayError>;

    /// Block up to `timeout` for a key press; `None` on timeout.
    fn wait_key(&mut self, timeout: Duration) -> Result<Option<i32>, DisplayError>;
}
