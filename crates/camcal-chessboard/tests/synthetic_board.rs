use approx::assert_abs_diff_eq;
use camcal_chessboard::{estimate_grid_axis, ChessboardDetector, ChessboardParams};
use camcal_core::{BoardGeometry, Corner};
use nalgebra::{Point2, Rotation2, Vector2};
use std::f32::consts::FRAC_PI_4;

const SPACING: f32 = 30.0;

/// Ideal ChESS corners of a `cols × rows` inner-corner lattice, rotated by `angle`.
fn lattice(cols: usize, rows: usize, origin: Point2<f32>, angle: f32) -> Vec<Corner> {
    let rot = Rotation2::new(angle);
    let mut corners = Vec::with_capacity(cols * rows);
    for j in 0..rows {
        for i in 0..cols {
            let offset = rot * Vector2::new(i as f32 * SPACING, j as f32 * SPACING);
            let diagonal = if (i + j) % 2 == 0 {
                FRAC_PI_4
            } else {
                3.0 * FRAC_PI_4
            };
            corners.push(Corner {
                position: origin + offset,
                orientation: diagonal + angle,
                strength: 1.0,
            });
        }
    }
    corners
}

fn detector() -> ChessboardDetector {
    ChessboardDetector::new(ChessboardParams::default())
}

#[test]
fn finds_axis_aligned_board_in_row_major_order() {
    let board = BoardGeometry::default();
    let corners = lattice(9, 6, Point2::new(50.0, 40.0), 0.0);

    let det = detector()
        .detect_from_corners(&corners, &board)
        .expect("board");
    assert!(!det.transposed);
    assert_eq!(det.points.len(), 54);
    for (idx, p) in det.points.iter().enumerate() {
        assert_abs_diff_eq!(p.x, 50.0 + SPACING * (idx % 9) as f32, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 40.0 + SPACING * (idx / 9) as f32, epsilon = 1e-3);
    }
}

#[test]
fn input_order_does_not_matter() {
    let board = BoardGeometry::default();
    let mut corners = lattice(9, 6, Point2::new(50.0, 40.0), 0.0);
    corners.reverse();
    corners.swap(3, 40);

    let det = detector()
        .detect_from_corners(&corners, &board)
        .expect("board");
    assert_abs_diff_eq!(det.points[0].x, 50.0, epsilon = 1e-3);
    assert_abs_diff_eq!(det.points[0].y, 40.0, epsilon = 1e-3);
    assert_abs_diff_eq!(det.points[53].x, 50.0 + 8.0 * SPACING, epsilon = 1e-3);
}

#[test]
fn follows_a_rotated_board() {
    let board = BoardGeometry::default();
    let angle = 12f32.to_radians();
    let corners = lattice(9, 6, Point2::new(120.0, 60.0), angle);

    let axis = estimate_grid_axis(&corners).expect("axis");
    assert_abs_diff_eq!(axis, angle, epsilon = 1e-4);

    let det = detector()
        .detect_from_corners(&corners, &board)
        .expect("board");
    assert!(!det.transposed);
    for (p, c) in det.points.iter().zip(&corners) {
        assert_abs_diff_eq!(p.x, c.position.x, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, c.position.y, epsilon = 1e-3);
    }
}

#[test]
fn reports_transposed_board() {
    let board = BoardGeometry::default();
    let corners = lattice(6, 9, Point2::new(30.0, 30.0), 0.0);

    let det = detector()
        .detect_from_corners(&corners, &board)
        .expect("board");
    assert!(det.transposed);
    for (idx, p) in det.points.iter().enumerate() {
        assert_abs_diff_eq!(p.x, 30.0 + SPACING * (idx / 9) as f32, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 30.0 + SPACING * (idx % 9) as f32, epsilon = 1e-3);
    }
}

#[test]
fn ignores_unrelated_corners() {
    let board = BoardGeometry::default();
    let mut corners = lattice(9, 6, Point2::new(50.0, 40.0), 0.0);
    corners.push(Corner {
        position: Point2::new(900.0, 700.0),
        orientation: FRAC_PI_4,
        strength: 1.0,
    });

    let pattern = detector().detect_pattern(&corners, &board);
    assert!(pattern.is_complete_for(&board));
}

#[test]
fn incomplete_board_is_not_found() {
    let board = BoardGeometry::default();
    let mut corners = lattice(9, 6, Point2::new(50.0, 40.0), 0.0);
    corners.remove(20);

    assert!(detector().detect_from_corners(&corners, &board).is_none());
    let pattern = detector().detect_pattern(&corners, &board);
    assert!(!pattern.found);
    assert!(pattern.points.is_empty());
}

#[test]
fn wrong_board_size_is_not_found() {
    let board = BoardGeometry::default();
    let corners = lattice(8, 7, Point2::new(50.0, 40.0), 0.0);
    assert!(detector().detect_from_corners(&corners, &board).is_none());
}

#[test]
fn weak_corners_are_filtered() {
    let board = BoardGeometry::default();
    let mut corners = lattice(9, 6, Point2::new(50.0, 40.0), 0.0);
    corners[10].strength = 0.01;

    let params = ChessboardParams {
        min_strength: 0.5,
        ..Default::default()
    };
    let det = ChessboardDetector::new(params).detect_from_corners(&corners, &board);
    assert!(det.is_none());
}

#[test]
fn params_round_trip_through_json() {
    let json = r#"{ "min_strength": 0.2, "graph": { "min_spacing_pix": 4.0,
        "max_spacing_pix": 90.0, "k_neighbors": 6, "orientation_tolerance_deg": 20.0 } }"#;
    let params: ChessboardParams = serde_json::from_str(json).unwrap();
    assert_eq!(params.graph.k_neighbors, 6);
    let defaults: ChessboardParams = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults.graph.k_neighbors, 8);
}
