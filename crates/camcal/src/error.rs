use camcal_core::{BoardError, CalibrationIoError, SessionError};
use camcal_solver::CalibrateError;
use std::path::PathBuf;

use crate::config::ConfigError;

/// Errors produced by the high-level facade helpers and the CLI.
#[derive(thiserror::Error, Debug)]
pub enum CamcalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    CalibrationFile(#[from] CalibrationIoError),

    #[error(transparent)]
    Calibrate(#[from] CalibrateError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error("no images found in {}", .0.display())]
    NoImages(PathBuf),

    #[error("not enough samples with a detected board: have {have}, need {need}")]
    NotEnoughSamples { have: usize, need: usize },

    #[error("camera {0} could not be opened")]
    CameraUnavailable(i32),

    #[cfg(feature = "opencv")]
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}
