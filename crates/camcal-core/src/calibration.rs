//! Calibration result and its flat-text file format.
//!
//! The file holds one decimal value per line: the 3x3 camera matrix in
//! row-major order (9 lines) followed by the distortion coefficients
//! (8 lines). No header, no delimiters.

use nalgebra::{Matrix3, SVector};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Number of distortion coefficients: OpenCV order `k1 k2 p1 p2 k3 k4 k5 k6`.
pub const DISTORTION_LEN: usize = 8;

/// Number of values stored in a calibration file.
pub const CALIBRATION_VALUE_COUNT: usize = 9 + DISTORTION_LEN;

#[derive(thiserror::Error, Debug)]
pub enum CalibrationIoError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {line}: invalid number {value:?}")]
    Parse { line: usize, value: String },
    #[error("expected {expected} values, found {got}")]
    ValueCount { expected: usize, got: usize },
}

/// Intrinsics and lens distortion of one camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub camera_matrix: Matrix3<f64>,
    pub distortion: SVector<f64, DISTORTION_LEN>,
    /// RMS reprojection error in pixels, when the solver reports one.
    #[serde(default)]
    pub rms: Option<f64>,
}

impl CalibrationResult {
    pub fn new(camera_matrix: Matrix3<f64>, distortion: SVector<f64, DISTORTION_LEN>) -> Self {
        Self {
            camera_matrix,
            distortion,
            rms: None,
        }
    }

    /// Zero-skew pinhole matrix with the given distortion.
    pub fn from_pinhole(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        distortion: [f64; DISTORTION_LEN],
    ) -> Self {
        let k = Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);
        Self::new(k, SVector::from(distortion))
    }

    pub fn with_rms(mut self, rms: f64) -> Self {
        self.rms = Some(rms);
        self
    }

    pub fn fx(&self) -> f64 {
        self.camera_matrix[(0, 0)]
    }

    pub fn fy(&self) -> f64 {
        self.camera_matrix[(1, 1)]
    }

    pub fn cx(&self) -> f64 {
        self.camera_matrix[(0, 2)]
    }

    pub fn cy(&self) -> f64 {
        self.camera_matrix[(1, 2)]
    }

    /// All stored values in file order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let k = &self.camera_matrix;
        (0..3)
            .flat_map(move |r| (0..3).map(move |c| k[(r, c)]))
            .chain(self.distortion.iter().copied())
    }

    fn from_values(values: &[f64]) -> Result<Self, CalibrationIoError> {
        if values.len() != CALIBRATION_VALUE_COUNT {
            return Err(CalibrationIoError::ValueCount {
                expected: CALIBRATION_VALUE_COUNT,
                got: values.len(),
            });
        }
        let camera_matrix = Matrix3::from_row_slice(&values[..9]);
        let distortion = SVector::<f64, DISTORTION_LEN>::from_column_slice(&values[9..]);
        Ok(Self::new(camera_matrix, distortion))
    }
}

/// Write `result` to any sink, one value per line.
pub fn write_values<W: Write>(out: &mut W, result: &CalibrationResult) -> io::Result<()> {
    for v in result.values() {
        writeln!(out, "{v}")?;
    }
    Ok(())
}

/// Create or truncate `path` and write the calibration to it.
pub fn write_calibration(
    path: impl AsRef<Path>,
    result: &CalibrationResult,
) -> Result<(), CalibrationIoError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_values(&mut out, result)?;
    out.flush()?;
    Ok(())
}

/// Read a file produced by [`write_calibration`]. Blank lines are skipped.
pub fn read_calibration(path: impl AsRef<Path>) -> Result<CalibrationResult, CalibrationIoError> {
    let raw = fs::read_to_string(path)?;
    let mut values = Vec::with_capacity(CALIBRATION_VALUE_COUNT);
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v: f64 = line.parse().map_err(|_| CalibrationIoError::Parse {
            line: idx + 1,
            value: line.to_string(),
        })?;
        values.push(v);
    }
    CalibrationResult::from_values(&values)
}
