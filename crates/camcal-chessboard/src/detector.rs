use crate::geom::wrap_quarter;
use crate::gridgraph::{assign_grid_coordinates, connected_components, GridGraph};
use crate::params::ChessboardParams;
use camcal_core::{BoardGeometry, Corner, DetectedPattern};
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Estimate the grid `u` axis angle from ChESS corner orientations.
///
/// Orientations are light-square diagonals, so the two corner families sit at
/// θ and θ + π/2. Averaging in quadruple-angle space merges both families;
/// the grid axis is the mean diagonal rotated by π/4, returned in `(-π/4, π/4]`
/// so that `u` stays closest to the image x axis.
pub fn estimate_grid_axis(corners: &[Corner]) -> Option<f32> {
    let mut sum = Vector2::<f32>::zeros();
    let mut weight_sum = 0.0f32;

    for c in corners {
        let w = c.strength.max(0.0);
        if w <= 0.0 {
            continue;
        }
        let four_theta = 4.0 * c.orientation;
        sum += w * Vector2::new(four_theta.cos(), four_theta.sin());
        weight_sum += w;
    }

    if weight_sum <= 0.0 {
        return None;
    }
    let mean = sum / weight_sum;
    if mean.norm_squared() < 1e-6 {
        return None;
    }

    let diagonal = 0.25 * mean.y.atan2(mean.x);
    Some(wrap_quarter(diagonal - std::f32::consts::FRAC_PI_4))
}

/// A complete board found in a corner cloud.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChessboardDetection {
    /// Image points, row-major over the board.
    pub points: Vec<Point2<f32>>,
    /// The board appeared rotated by ~90°: board rows run along image columns.
    pub transposed: bool,
    /// Grid axis angle used for labeling, radians.
    pub axis_angle: f32,
}

impl From<ChessboardDetection> for DetectedPattern {
    fn from(det: ChessboardDetection) -> Self {
        DetectedPattern::found(det.points)
    }
}

/// Chessboard detector using ChESS orientations + grid graph labeling.
pub struct ChessboardDetector {
    pub params: ChessboardParams,
}

impl ChessboardDetector {
    pub fn new(params: ChessboardParams) -> Self {
        Self { params }
    }

    /// Find the full inner-corner grid of `board` among `corners`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, corners), fields(num_corners = corners.len()))
    )]
    pub fn detect_from_corners(
        &self,
        corners: &[Corner],
        board: &BoardGeometry,
    ) -> Option<ChessboardDetection> {
        let needed = board.corner_count();
        let strong: Vec<Corner> = corners
            .iter()
            .filter(|c| c.strength >= self.params.min_strength)
            .cloned()
            .collect();

        debug!("{} ChESS corners after strength filter", strong.len());
        if strong.len() < needed {
            return None;
        }

        let Some(axis_angle) = estimate_grid_axis(&strong) else {
            debug!("failed to estimate grid axis from orientations");
            return None;
        };

        let graph = GridGraph::new(&strong, &self.params.graph, axis_angle);
        let mut components = connected_components(&graph);
        components.retain(|c| c.len() == needed);

        for component in &components {
            let Some(coords) = assign_grid_coordinates(&graph, component) else {
                continue;
            };
            if let Some((points, transposed)) = order_board_points(&strong, &coords, board) {
                info!(
                    "chessboard {}x{} found{}",
                    board.width,
                    board.height,
                    if transposed { " (transposed)" } else { "" }
                );
                return Some(ChessboardDetection {
                    points,
                    transposed,
                    axis_angle,
                });
            }
        }

        None
    }

    /// Convenience wrapper producing a [`DetectedPattern`].
    pub fn detect_pattern(&self, corners: &[Corner], board: &BoardGeometry) -> DetectedPattern {
        self.detect_from_corners(corners, board)
            .map(DetectedPattern::from)
            .unwrap_or_default()
    }
}

/// Map labeled nodes onto the board's row-major order.
///
/// The labels must fill a `width × height` rectangle exactly, or its
/// transpose when the board is seen rotated.
fn order_board_points(
    corners: &[Corner],
    coords: &[(usize, i32, i32)],
    board: &BoardGeometry,
) -> Option<(Vec<Point2<f32>>, bool)> {
    let min_i = coords.iter().map(|c| c.1).min()?;
    let max_i = coords.iter().map(|c| c.1).max()?;
    let min_j = coords.iter().map(|c| c.2).min()?;
    let max_j = coords.iter().map(|c| c.2).max()?;
    let cols = (max_i - min_i + 1) as u32;
    let rows = (max_j - min_j + 1) as u32;

    let transposed = if (cols, rows) == (board.width, board.height) {
        false
    } else if (cols, rows) == (board.height, board.width) {
        true
    } else {
        debug!("component spans {cols}x{rows}, board is {board}");
        return None;
    };

    let cells: HashMap<(i32, i32), usize> = coords
        .iter()
        .map(|&(node, i, j)| ((i - min_i, j - min_j), node))
        .collect();

    let mut points = Vec::with_capacity(board.corner_count());
    for r in 0..board.height as i32 {
        for c in 0..board.width as i32 {
            let key = if transposed { (r, c) } else { (c, r) };
            let node = *cells.get(&key)?;
            points.push(corners[node].position);
        }
    }
    Some((points, transposed))
}
