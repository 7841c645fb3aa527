//! Core types for interactive chessboard camera calibration.
//!
//! This crate holds everything that does not depend on a concrete corner
//! detector, solver, camera or window:
//! - the data model (`Frame`, `DetectedPattern`, `SampleSet`,
//!   `CalibrationResult`, `BoardGeometry`),
//! - the flat-text calibration file format,
//! - the collaborator traits and the keyboard-driven `Session` loop.
//!
//! ## Quickstart
//!
//! ```
//! use camcal_core::BoardGeometry;
//!
//! let board = BoardGeometry::default();
//! let points = board.object_points();
//! assert_eq!(points.len(), 9 * 6);
//! ```

mod board;
mod calibration;
mod frame;
mod logger;
mod pattern;
mod samples;
mod session;
mod traits;

pub use board::{BoardError, BoardGeometry};
pub use calibration::{
    read_calibration, write_calibration, write_values, CalibrationIoError, CalibrationResult,
    CALIBRATION_VALUE_COUNT, DISTORTION_LEN,
};
pub use frame::Frame;
pub use pattern::{Corner, DetectedPattern};
pub use samples::{Sample, SampleError, SampleSet};
pub use session::{
    Input, Session, SessionConfig, SessionError, SessionState, SessionSummary, StepOutcome,
};
pub use traits::{CalibrationEngine, Display, DisplayError, FrameSource, PatternDetector};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
