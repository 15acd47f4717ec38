//! Application configuration.
//!
//! Stored as YAML under `$HOME/.lstmvis/config.yaml`.  Every field has a
//! default, so partial files are accepted.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest cell width the layout actions allow.
pub const MIN_CELL_WIDTH: u32 = 5;

/// Settings for the explorer application and its controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmVisConfig {
    /// Base URL of the API, without a trailing endpoint.
    pub server_url: String,
    /// Minimum interval between two URL history updates.
    pub url_sync_interval_ms: u64,
    /// Minimum interval between two selection recomputations caused by
    /// continuous gestures (brush drag, padding drag, threshold drag).
    pub selection_throttle_ms: u64,
    /// Number of run segments shown in the selection preview.
    pub segment_limit: usize,
    /// Offset applied by the position shift buttons.
    pub position_step: i64,
    /// Cell width change applied by the layout buttons.
    pub cell_width_step: u32,
    /// Maximum number of hits asked from `/search`.
    pub search_limit: usize,
    /// Window title.
    pub title: String,
    /// Initial native window size in points.
    pub window_size: Option<[f32; 2]>,
}

impl Default for LstmVisConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8888/api/v2".to_string(),
            url_sync_interval_ms: 200,
            selection_throttle_ms: 200,
            segment_limit: 20,
            position_step: 5,
            cell_width_step: 5,
            search_limit: 20,
            title: "LSTMVis".to_string(),
            window_size: Some([1280.0, 900.0]),
        }
    }
}

impl LstmVisConfig {
    pub fn url_sync_interval(&self) -> Duration {
        Duration::from_millis(self.url_sync_interval_ms)
    }

    pub fn selection_throttle(&self) -> Duration {
        Duration::from_millis(self.selection_throttle_ms)
    }

    /// `$HOME/.lstmvis/config.yaml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(".lstmvis").join("config.yaml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let s = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let s = serde_yaml::to_string(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn load_from_default_path() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::default_path()?)
    }

    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::default_path()?)
    }
}
