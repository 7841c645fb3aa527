use crate::{BoardGeometry, DetectedPattern, Frame};
use nalgebra::Point2;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("pattern not found in frame")]
    PatternNotFound,
    #[error("expected {expected} corners, detector reported {got}")]
    PointCount { expected: usize, got: usize },
}

/// A confirmed calibration view: the frame and the corners found in it.
#[derive(Clone, Debug)]
pub struct Sample {
    pub frame: Frame,
    pub pattern: DetectedPattern,
}

/// Ordered, append-only collection of confirmed views of one board.
#[derive(Clone, Debug)]
pub struct SampleSet {
    board: BoardGeometry,
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(board: BoardGeometry) -> Self {
        Self {
            board,
            samples: Vec::new(),
        }
    }

    pub fn board(&self) -> &BoardGeometry {
        &self.board
    }

    /// Append a copy of `frame` if `pattern` is a complete view of the board.
    ///
    /// Returns the new number of samples.
    pub fn push(&mut self, frame: &Frame, pattern: &DetectedPattern) -> Result<usize, SampleError> {
        if !pattern.found {
            return Err(SampleError::PatternNotFound);
        }
        let expected = self.board.corner_count();
        if pattern.points.len() != expected {
            return Err(SampleError::PointCount {
                expected,
                got: pattern.points.len(),
            });
        }
        self.samples.push(Sample {
            frame: frame.clone(),
            pattern: pattern.clone(),
        });
        Ok(self.samples.len())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Strictly more than `min_samples` views collected.
    pub fn is_ready(&self, min_samples: usize) -> bool {
        self.samples.len() > min_samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Per-view image points, in sample order.
    pub fn image_points(&self) -> impl Iterator<Item = &[Point2<f32>]> + '_ {
        self.samples.iter().map(|s| s.pattern.points.as_slice())
    }

    /// Size of the first sample's frame; all frames come from one camera.
    pub fn image_size(&self) -> Option<(usize, usize)> {
        self.samples.first().map(|s| (s.frame.width, s.frame.height))
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardGeometry {
        BoardGeometry::new(3, 2, 1.0).unwrap()
    }

    #[test]
    fn only_complete_views_are_kept() {
        let mut set = SampleSet::new(board());
        let frame = Frame::filled(4, 4, [0, 0, 0]);

        assert_eq!(
            set.push(&frame, &DetectedPattern::not_found()),
            Err(SampleError::PatternNotFound)
        );
        let short = DetectedPattern::found(vec![Point2::new(1.0, 1.0); 5]);
        assert_eq!(
            set.push(&frame, &short),
            Err(SampleError::PointCount {
                expected: 6,
                got: 5
            })
        );
        assert!(set.is_empty());

        let full = DetectedPattern::found(vec![Point2::new(1.0, 1.0); 6]);
        assert_eq!(set.push(&frame, &full), Ok(1));
        assert_eq!(set.push(&frame, &full), Ok(2));
        assert_eq!(set.image_points().count(), 2);
        assert_eq!(set.image_size(), Some((4, 4)));
    }

    #[test]
    fn readiness_is_strictly_greater() {
        let mut set = SampleSet::new(board());
        let frame = Frame::filled(2, 2, [0, 0, 0]);
        let full = DetectedPattern::found(vec![Point2::new(0.0, 0.0); 6]);
        for _ in 0..3 {
            set.push(&frame, &full).unwrap();
        }
        assert!(!set.is_ready(3));
        set.push(&frame, &full).unwrap();
        assert!(set.is_ready(3));
    }
}
