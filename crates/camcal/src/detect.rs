use crate::core::{BoardGeometry, Corner, DetectedPattern, Frame, PatternDetector};
use crate::chessboard::{ChessboardDetector, ChessboardParams};
use chess_corners::{
    find_chess_corners_image, AxisEstimate, ChessConfig, CornerDescriptor, ThresholdMode,
};
use log::{trace, warn};
use nalgebra::Point2;
use std::f32::consts::PI;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Reasonable default settings for the `chess-corners` ChESS detector.
///
/// Tuned for printed boards filling a sizeable part of a webcam frame;
/// callers can override it for difficult images.
pub fn default_chess_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = 0.2;
    cfg.nms_radius = 2;
    cfg
}

/// Luminance image of a frame.
pub fn frame_to_gray(frame: &Frame) -> Option<::image::GrayImage> {
    ::image::GrayImage::from_raw(frame.width as u32, frame.height as u32, frame.to_luma())
}

/// Wrap an RGB image as a [`Frame`].
pub fn frame_from_rgb(img: ::image::RgbImage) -> Option<Frame> {
    let (w, h) = img.dimensions();
    Frame::from_rgb(w as usize, h as usize, img.into_raw())
}

/// Detect ChESS corners and adapt them into [`Corner`]s.
///
/// A detector error is logged and yields no corners.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, cfg), fields(width = img.width(), height = img.height()))
)]
pub fn detect_corners(img: &::image::GrayImage, cfg: &ChessConfig) -> Vec<Corner> {
    match find_chess_corners_image(img, cfg) {
        Ok(descriptors) => descriptors.iter().map(adapt_chess_corner).collect(),
        Err(e) => {
            warn!("ChESS detection failed: {e}");
            Vec::new()
        }
    }
}

/// Run the chessboard detector end-to-end: ChESS corners -> board grid.
pub fn detect_chessboard(
    img: &::image::GrayImage,
    chess_cfg: &ChessConfig,
    params: ChessboardParams,
    board: &BoardGeometry,
) -> DetectedPattern {
    let corners = detect_corners(img, chess_cfg);
    ChessboardDetector::new(params).detect_pattern(&corners, board)
}

/// [`PatternDetector`] backed by `chess-corners` and the grid-graph detector.
pub struct ChessCornersDetector {
    chess: ChessConfig,
    detector: ChessboardDetector,
}

impl ChessCornersDetector {
    pub fn new(chess: ChessConfig, params: ChessboardParams) -> Self {
        Self {
            chess,
            detector: ChessboardDetector::new(params),
        }
    }
}

impl Default for ChessCornersDetector {
    fn default() -> Self {
        Self::new(default_chess_config(), ChessboardParams::default())
    }
}

impl PatternDetector for ChessCornersDetector {
    fn detect(&mut self, frame: &Frame, board: &BoardGeometry) -> DetectedPattern {
        let Some(gray) = frame_to_gray(frame) else {
            warn!("frame buffer does not match {}x{}", frame.width, frame.height);
            return DetectedPattern::not_found();
        };
        let corners = detect_corners(&gray, &self.chess);
        trace!("{} ChESS corners", corners.len());
        self.detector.detect_pattern(&corners, board)
    }
}

/// Light-square diagonal of a corner, modulo π.
///
/// `chess-corners` reports the two grid axes with a dark sector swept from
/// `axes[0]` to `axes[1]`; the bright sector starts at `axes[1]` and ends at
/// `axes[0] + π`, and its bisector is the diagonal the grid graph expects.
fn bright_diagonal(axes: &[AxisEstimate; 2]) -> f32 {
    (0.5 * (axes[0].angle + axes[1].angle + PI)).rem_euclid(PI)
}

fn adapt_chess_corner(c: &CornerDescriptor) -> Corner {
    Corner {
        position: Point2::new(c.x, c.y),
        orientation: bright_diagonal(&c.axes),
        strength: c.response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_conversion_keeps_dimensions() {
        let frame = Frame::filled(7, 5, [10, 200, 30]);
        let gray = frame_to_gray(&frame).unwrap();
        assert_eq!(gray.dimensions(), (7, 5));
        assert_eq!(gray.as_raw(), &frame.to_luma());
    }

    #[test]
    fn rgb_image_becomes_frame() {
        let img = ::image::RgbImage::from_pixel(4, 3, ::image::Rgb([1, 2, 3]));
        let frame = frame_from_rgb(img).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.pixel(3, 2), Some([1, 2, 3]));
    }

    fn axes(a0: f32, a1: f32) -> [AxisEstimate; 2] {
        [AxisEstimate::new(a0, 0.01), AxisEstimate::new(a1, 0.01)]
    }

    fn close_mod_pi(a: f32, b: f32) -> bool {
        let d = (a - b).rem_euclid(PI);
        d.min(PI - d) < 1e-5
    }

    #[test]
    fn diagonal_bisects_the_bright_sector() {
        use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

        // Dark from +x to +y: bright quadrant is (π/2, π).
        assert!(close_mod_pi(bright_diagonal(&axes(0.0, FRAC_PI_2)), 3.0 * FRAC_PI_4));
        // The neighbouring corner has the opposite polarity.
        assert!(close_mod_pi(bright_diagonal(&axes(FRAC_PI_2, PI)), FRAC_PI_4));
        // Skewed axes under perspective.
        assert!(close_mod_pi(bright_diagonal(&axes(0.2, 1.9)), 0.5 * (2.1 + PI)));
    }

    #[test]
    fn diagonal_stays_in_half_turn() {
        for (a0, a1) in [(0.0, 1.5), (3.0, 4.6), (1.2, 2.9)] {
            let d = bright_diagonal(&axes(a0, a1));
            assert!((0.0..PI).contains(&d), "{a0} {a1} -> {d}");
        }
    }

    #[test]
    fn default_config_uses_relative_threshold() {
        let cfg = default_chess_config();
        assert_eq!(cfg.threshold_mode, ThresholdMode::Relative);
        assert_eq!(cfg.threshold_value, 0.2);
    }

    #[test]
    fn blank_frame_has_no_board() {
        let mut detector = ChessCornersDetector::default();
        let frame = Frame::filled(128, 96, [200, 200, 200]);
        let pattern = detector.detect(&frame, &BoardGeometry::default());
        assert!(!pattern.found);
        assert!(pattern.points.is_empty());
    }
}
