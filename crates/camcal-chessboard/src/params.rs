use serde::{Deserialize, Serialize};

/// Neighbor search settings for the grid graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridGraphParams {
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    pub k_neighbors: usize,
    pub orientation_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 5.0,
            max_spacing_pix: 200.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}

/// Parameters specific to the chessboard detector.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ChessboardParams {
    /// Minimal corner strength to consider.
    #[serde(default)]
    pub min_strength: f32,

    #[serde(default)]
    pub graph: GridGraphParams,
}
