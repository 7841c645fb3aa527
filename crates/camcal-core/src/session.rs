//! Keyboard-driven capture loop.
//!
//! One iteration: grab a frame, detect the board, show it, wait one frame
//! period for a key, act on the key. The loop ends on ESC or when the
//! frame source runs dry.

use crate::{
    write_calibration, BoardGeometry, CalibrationEngine, CalibrationResult, DetectedPattern,
    Display, DisplayError, Frame, FrameSource, PatternDetector, SampleSet,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// What a key press asks the session to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Capture,
    Calibrate,
    Exit,
    Ignore,
}

impl Input {
    pub const KEY_SPACE: i32 = 32;
    pub const KEY_ENTER: i32 = 13;
    pub const KEY_LINE_FEED: i32 = 10;
    pub const KEY_ESC: i32 = 27;

    /// Classify a raw key code; `None` is a timeout.
    pub fn from_key(key: Option<i32>) -> Self {
        match key {
            Some(Self::KEY_SPACE) => Input::Capture,
            Some(Self::KEY_ENTER) | Some(Self::KEY_LINE_FEED) => Input::Calibrate,
            Some(Self::KEY_ESC) => Input::Exit,
            _ => Input::Ignore,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Exited,
}

/// Result of one loop iteration.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// Frame source ended or ESC was pressed.
    Exited,
    /// A copy of the frame was added; `samples` is the new count.
    Captured { samples: usize },
    /// Capture requested without a complete detection.
    CaptureSkipped,
    /// Calibration solved and written to `path`.
    Calibrated { samples: usize, path: PathBuf },
    /// Calibration requested with too few samples.
    CalibrationSkipped { samples: usize },
    /// Solver or file write failed; the session keeps running.
    CalibrationFailed,
    /// Timeout or an unbound key.
    Idle,
}

fn default_min_samples() -> usize {
    15
}

fn default_output_path() -> PathBuf {
    PathBuf::from("camera-calibration.txt")
}

fn default_fps() -> f64 {
    30.0
}

/// Session knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub board: BoardGeometry,
    /// Calibration runs only with strictly more samples than this.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Frame rate used to pace the key wait.
    #[serde(default = "default_fps")]
    pub fps: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board: BoardGeometry::default(),
            min_samples: default_min_samples(),
            output_path: default_output_path(),
            fps: default_fps(),
        }
    }
}

impl SessionConfig {
    /// Key wait per iteration, `1000 / fps` milliseconds, at least 1 ms.
    pub fn key_timeout(&self) -> Duration {
        let fps = if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            default_fps()
        };
        Duration::from_millis((1000.0 / fps).round().max(1.0) as u64)
    }
}

/// Totals reported once the loop exits.
#[derive(Clone, Debug, Default)]
pub struct SessionSummary {
    pub samples: usize,
    pub calibrations_written: usize,
    pub failures: usize,
    pub last_result: Option<CalibrationResult>,
}

pub struct Session {
    config: SessionConfig,
    samples: SampleSet,
    state: SessionState,
    summary: SessionSummary,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let samples = SampleSet::new(config.board);
        Self {
            config,
            samples,
            state: SessionState::Running,
            summary: SessionSummary::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Run one iteration of the loop.
    pub fn step<S, P, E, D>(
        &mut self,
        source: &mut S,
        detector: &mut P,
        engine: &mut E,
        display: &mut D,
    ) -> Result<StepOutcome, SessionError>
    where
        S: FrameSource + ?Sized,
        P: PatternDetector + ?Sized,
        E: CalibrationEngine + ?Sized,
        D: Display + ?Sized,
    {
        if self.state == SessionState::Exited {
            return Ok(StepOutcome::Exited);
        }

        let Some(frame) = source.next_frame() else {
            info!("frame source closed, leaving session");
            self.state = SessionState::Exited;
            return Ok(StepOutcome::Exited);
        };

        let pattern = detector.detect(&frame, &self.config.board);
        display.show(&frame, &pattern)?;
        let key = display.wait_key(self.config.key_timeout())?;

        Ok(self.handle_input(Input::from_key(key), &frame, &pattern, engine))
    }

    /// Apply one classified input to the session state.
    pub fn handle_input<E>(
        &mut self,
        input: Input,
        frame: &Frame,
        pattern: &DetectedPattern,
        engine: &mut E,
    ) -> StepOutcome
    where
        E: CalibrationEngine + ?Sized,
    {
        if self.state == SessionState::Exited {
            return StepOutcome::Exited;
        }

        match input {
            Input::Capture => match self.samples.push(frame, pattern) {
                Ok(n) => {
                    info!("captured sample {n}");
                    StepOutcome::Captured { samples: n }
                }
                Err(err) => {
                    debug!("capture ignored: {err}");
                    StepOutcome::CaptureSkipped
                }
            },
            Input::Calibrate => self.calibrate(engine),
            Input::Exit => {
                info!("exit requested with {} samples", self.samples.len());
                self.state = SessionState::Exited;
                StepOutcome::Exited
            }
            Input::Ignore => StepOutcome::Idle,
        }
    }

    /// Loop until exit, returning what was collected and written.
    pub fn run<S, P, E, D>(
        &mut self,
        source: &mut S,
        detector: &mut P,
        engine: &mut E,
        display: &mut D,
    ) -> Result<SessionSummary, SessionError>
    where
        S: FrameSource + ?Sized,
        P: PatternDetector + ?Sized,
        E: CalibrationEngine + ?Sized,
        D: Display + ?Sized,
    {
        info!(
            "session started: board {}, need more than {} samples, output {}",
            self.config.board,
            self.config.min_samples,
            self.config.output_path.display()
        );
        while self.state == SessionState::Running {
            self.step(source, detector, engine, display)?;
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            samples: self.samples.len(),
            ..self.summary.clone()
        }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, engine), fields(samples = self.samples.len()))
    )]
    fn calibrate<E>(&mut self, engine: &mut E) -> StepOutcome
    where
        E: CalibrationEngine + ?Sized,
    {
        let n = self.samples.len();
        if !self.samples.is_ready(self.config.min_samples) {
            debug!(
                "calibration ignored: {n} samples, need more than {}",
                self.config.min_samples
            );
            return StepOutcome::CalibrationSkipped { samples: n };
        }

        let board = self.config.board;
        let result = match engine.calibrate(&self.samples, &board) {
            Ok(result) => result,
            Err(err) => {
                error!("calibration failed with {n} samples: {err}");
                self.summary.failures += 1;
                return StepOutcome::CalibrationFailed;
            }
        };

        let path = self.config.output_path.clone();
        if let Err(err) = write_calibration(&path, &result) {
            error!("failed to write calibration to {}: {err}", path.display());
            self.summary.failures += 1;
            return StepOutcome::CalibrationFailed;
        }

        match result.rms {
            Some(rms) => info!(
                "calibration from {n} samples written to {} (rms {rms:.4} px)",
                path.display()
            ),
            None => info!("calibration from {n} samples written to {}", path.display()),
        }
        if result.rms.is_some_and(|rms| rms > 1.0) {
            warn!("reprojection error above 1 px, consider recapturing");
        }
        self.summary.calibrations_written += 1;
        self.summary.last_result = Some(result);
        StepOutcome::Calibrated { samples: n, path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_codes_map_to_inputs() {
        assert_eq!(Input::from_key(Some(32)), Input::Capture);
        assert_eq!(Input::from_key(Some(13)), Input::Calibrate);
        assert_eq!(Input::from_key(Some(10)), Input::Calibrate);
        assert_eq!(Input::from_key(Some(27)), Input::Exit);
        assert_eq!(Input::from_key(Some('q' as i32)), Input::Ignore);
        assert_eq!(Input::from_key(None), Input::Ignore);
    }

    #[test]
    fn key_timeout_follows_fps() {
        let mut cfg = SessionConfig::default();
        assert_eq!(cfg.key_timeout(), Duration::from_millis(33));
        cfg.fps = 0.0;
        assert_eq!(cfg.key_timeout(), Duration::from_millis(33));
        cfg.fps = 5000.0;
        assert_eq!(cfg.key_timeout(), Duration::from_millis(1));
    }
}
