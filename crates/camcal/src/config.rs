//! JSON configuration for the capture session, detector and solver.

use camcal_chessboard::ChessboardParams;
use camcal_core::{BoardError, SessionConfig};
use camcal_solver::ZhangParams;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidBoard(#[from] BoardError),
}

fn default_window_title() -> String {
    "camcal".to_string()
}

/// Everything the `camcal` binary can be told through a config file.
///
/// Session fields (`board`, `min_samples`, `output_path`, `fps`) sit at the
/// top level of the JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamcalConfig {
    #[serde(flatten)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera_index: i32,
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default)]
    pub chessboard: ChessboardParams,
    #[serde(default)]
    pub solver: ZhangParams,
}

impl Default for CamcalConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            camera_index: 0,
            window_title: default_window_title(),
            chessboard: ChessboardParams::default(),
            solver: ZhangParams::default(),
        }
    }
}

impl CamcalConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.board.validate()?;
        Ok(())
    }
}
