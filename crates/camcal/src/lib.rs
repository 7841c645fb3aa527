//! High-level facade crate for the `camcal-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, chessboard and solver crates,
//! - (feature `image`) a `chess-corners` backed [`PatternDetector`] and a
//!   still-image [`FrameSource`],
//! - (feature `opencv`) a camera source, a HighGUI display and the ArUco
//!   marker generator,
//! - headless batch calibration and the JSON configuration used by the
//!   `camcal` binary.
//!
//! ## Quickstart
//!
//! ```no_run
//! use camcal::detect::ChessCornersDetector;
//! use camcal::source::ImageSequenceSource;
//! use camcal::{calibrate_frames, CamcalConfig, ZhangCalibrationEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CamcalConfig::default();
//! let mut source = ImageSequenceSource::from_dir("captures")?;
//! let mut detector = ChessCornersDetector::default();
//! let mut engine = ZhangCalibrationEngine::new(config.solver);
//!
//! let report = calibrate_frames(&mut source, &mut detector, &mut engine, &config.session)?;
//! println!("fx = {}", report.result.fx());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `camcal::core`: frames, board geometry, samples, calibration file, session loop.
//! - `camcal::chessboard`: chessboard grid assembly from ChESS corners.
//! - `camcal::solver`: homographies, Zhang intrinsics, distortion fit.
//! - `camcal::detect` (feature `image`): `chess-corners` adapter.
//! - `camcal::source` (feature `image`): image files as frames.
//! - `camcal::opencv_backend` (feature `opencv`): camera, window, markers.

pub use camcal_chessboard as chessboard;
pub use camcal_core as core;
pub use camcal_solver as solver;

pub use camcal_chessboard::ChessboardParams;
pub use camcal_core::{
    read_calibration, write_calibration, BoardGeometry, CalibrationEngine, CalibrationResult,
    DetectedPattern, Display, Frame, FrameSource, PatternDetector, SampleSet, Session,
    SessionConfig, SessionSummary,
};
pub use camcal_solver::{CalibrateError, ZhangCalibrationEngine, ZhangParams};

mod batch;
mod config;
mod error;

pub use batch::{calibrate_frames, BatchReport};
pub use config::{CamcalConfig, ConfigError};
pub use error::CamcalError;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod source;

#[cfg(feature = "opencv")]
pub mod opencv_backend;
