//! Chessboard detector working on a cloud of ChESS corners.
//!
//! ## Quickstart
//!
//! ```
//! use camcal_chessboard::{ChessboardDetector, ChessboardParams};
//! use camcal_core::{BoardGeometry, Corner};
//!
//! let detector = ChessboardDetector::new(ChessboardParams::default());
//! let corners: Vec<Corner> = Vec::new();
//! let result = detector.detect_from_corners(&corners, &BoardGeometry::default());
//! assert!(result.is_none());
//! ```
//!
//! Algorithm:
//! 1. Filter weak corners.
//! 2. Estimate the dominant grid axis from corner orientations (mod π/2).
//! 3. For each corner, find up to 4 neighbors (right/left/up/down) among its
//!    k nearest corners:
//!    - distance within the configured spacing window,
//!    - orientations roughly orthogonal,
//!    - edge direction at ~45° to both corner orientations.
//! 4. Split the 4-connected graph into components and BFS-label each with
//!    integer coordinates (i, j).
//! 5. Keep the first component that exactly fills a `width × height`
//!    rectangle (or its transpose) and emit its corners row-major.

mod detector;
mod geom;
mod gridgraph;
mod params;

pub use detector::{estimate_grid_axis, ChessboardDetection, ChessboardDetector};
pub use gridgraph::{
    assign_grid_coordinates, connected_components, GridGraph, NeighborDirection, NodeNeighbor,
};
pub use params::{ChessboardParams, GridGraphParams};
