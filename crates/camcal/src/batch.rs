//! Headless calibration from a finite frame sequence.

use crate::core::{
    write_calibration, CalibrationEngine, CalibrationResult, FrameSource, PatternDetector,
    SampleSet, SessionConfig,
};
use crate::CamcalError;
use log::{debug, info};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Outcome of [`calibrate_frames`].
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Frames read from the source.
    pub frames: usize,
    /// Frames in which the full board was found.
    pub samples: usize,
    pub result: CalibrationResult,
}

/// Detect the board in every frame of `source`, then calibrate once.
///
/// Every frame with a complete detection becomes a sample. Fails with
/// [`CamcalError::NotEnoughSamples`] unless the sample count exceeds
/// `config.min_samples`; on success the result is written to
/// `config.output_path`.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn calibrate_frames<S, P, E>(
    source: &mut S,
    detector: &mut P,
    engine: &mut E,
    config: &SessionConfig,
) -> Result<BatchReport, CamcalError>
where
    S: FrameSource,
    P: PatternDetector,
    E: CalibrationEngine,
    CamcalError: From<E::Error>,
{
    let board = config.board;
    let mut samples = SampleSet::new(board);
    let mut frames = 0usize;

    while let Some(frame) = source.next_frame() {
        frames += 1;
        let pattern = detector.detect(&frame, &board);
        match samples.push(&frame, &pattern) {
            Ok(n) => debug!("frame {frames}: board found ({n} samples)"),
            Err(e) => debug!("frame {frames}: {e}"),
        }
    }

    info!("board found in {} of {} frames", samples.len(), frames);
    if !samples.is_ready(config.min_samples) {
        return Err(CamcalError::NotEnoughSamples {
            have: samples.len(),
            need: config.min_samples + 1,
        });
    }

    let result = engine.calibrate(&samples, &board)?;
    write_calibration(&config.output_path, &result)?;
    info!("calibration written to {}", config.output_path.display());

    Ok(BatchReport {
        frames,
        samples: samples.len(),
        result,
    })
}
