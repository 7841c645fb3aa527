use crate::BoardGeometry;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Canonical 2D corner produced by a ChESS-style corner detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Corner {
    /// Corner position in pixel coordinates.
    pub position: Point2<f32>,

    /// Light-square diagonal at the corner, in radians.
    ///
    /// Defined modulo π; adjacent corners differ by about π/2.
    pub orientation: f32,

    /// Detector response.
    pub strength: f32,
}

/// Result of running a pattern detector on one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Image points, row-major over the board when `found`.
    pub points: Vec<Point2<f32>>,
    pub found: bool,
}

impl DetectedPattern {
    pub fn found(points: Vec<Point2<f32>>) -> Self {
        Self {
            points,
            found: true,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    /// True when this detection can be used as a calibration view of `board`.
    pub fn is_complete_for(&self, board: &BoardGeometry) -> bool {
        self.found && self.points.len() == board.corner_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_requires_flag_and_count() {
        let board = BoardGeometry::new(3, 2, 1.0).unwrap();
        let pts = vec![Point2::new(0.0, 0.0); 6];
        assert!(DetectedPattern::found(pts.clone()).is_complete_for(&board));
        let unflagged = DetectedPattern {
            points: pts.clone(),
            found: false,
        };
        assert!(!unflagged.is_complete_for(&board));
        assert!(!DetectedPattern::found(pts[..5].to_vec()).is_complete_for(&board));
        assert!(!DetectedPattern::not_found().is_complete_for(&board));
    }
}
