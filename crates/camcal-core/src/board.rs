use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("board needs at least 2x2 inner corners (got {width}x{height})")]
    TooSmall { width: u32, height: u32 },
    #[error("corner spacing must be positive and finite (got {0})")]
    InvalidSpacing(f64),
    #[error("invalid board size {0:?}, expected WIDTHxHEIGHT (e.g. 9x6)")]
    Parse(String),
}

/// Planar chessboard target: inner-corner grid and physical corner spacing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Inner corners along a row.
    pub width: u32,
    /// Inner corners along a column.
    pub height: u32,
    /// Distance between adjacent corners, in the unit the calibration is expressed in.
    pub spacing: f64,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            width: 9,
            height: 6,
            spacing: 0.023,
        }
    }
}

impl BoardGeometry {
    pub fn new(width: u32, height: u32, spacing: f64) -> Result<Self, BoardError> {
        let board = Self {
            width,
            height,
            spacing,
        };
        board.validate()?;
        Ok(board)
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.width < 2 || self.height < 2 {
            return Err(BoardError::TooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(BoardError::InvalidSpacing(self.spacing));
        }
        Ok(())
    }

    #[inline]
    pub fn corner_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Board-frame corner positions on the `z = 0` plane.
    ///
    /// Row-major: `point[i] = ((i % w) * s, (i / w) * s, 0)`. Detectors must
    /// report image points in the same order.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let s = self.spacing;
        let w = self.width;
        (0..self.height)
            .flat_map(|r| (0..w).map(move |c| Point3::new(c as f64 * s, r as f64 * s, 0.0)))
            .collect()
    }
}

impl fmt::Display for BoardGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {}", self.width, self.height, self.spacing)
    }
}

/// Parses the `WxH` part only; spacing keeps its default.
impl FromStr for BoardGeometry {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || BoardError::Parse(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(parse_err)?;
        let width = w.trim().parse().map_err(|_| parse_err())?;
        let height = h.trim().parse().map_err(|_| parse_err())?;
        Self::new(width, height, Self::default().spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn object_points_are_row_major() {
        let board = BoardGeometry::new(4, 3, 0.5).unwrap();
        let pts = board.object_points();
        assert_eq!(pts.len(), 12);
        for (i, p) in pts.iter().enumerate() {
            assert_relative_eq!(p.x, (i % 4) as f64 * 0.5);
            assert_relative_eq!(p.y, (i / 4) as f64 * 0.5);
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn default_board_matches_printed_target() {
        let board = BoardGeometry::default();
        let pts = board.object_points();
        assert_eq!(pts.len(), 54);
        let last = pts[53];
        assert_relative_eq!(last.x, 8.0 * 0.023, epsilon = 1e-12);
        assert_relative_eq!(last.y, 5.0 * 0.023, epsilon = 1e-12);
    }

    #[test]
    fn parses_size_strings() {
        let board: BoardGeometry = "7x5".parse().unwrap();
        assert_eq!((board.width, board.height), (7, 5));
        assert_eq!(" 9 X 6 ".parse::<BoardGeometry>().unwrap().corner_count(), 54);
        assert!(matches!("9".parse::<BoardGeometry>(), Err(BoardError::Parse(_))));
        assert!(matches!(
            "1x6".parse::<BoardGeometry>(),
            Err(BoardError::TooSmall { .. })
        ));
    }

    #[test]
    fn rejects_bad_spacing() {
        assert!(BoardGeometry::new(9, 6, 0.0).is_err());
        assert!(BoardGeometry::new(9, 6, f64::NAN).is_err());
    }
}
