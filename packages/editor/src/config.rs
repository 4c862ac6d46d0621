use crate::EditorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "pagecraft.config.json";

/// Editor settings, loadable from `pagecraft.config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Grid pitch used when snapping positions
    pub grid_size: f64,

    pub snap_to_grid: bool,

    /// Quiet period before a scheduled write is sent
    pub debounce_ms: u64,

    /// Bound for both the undo and the redo stack
    pub history_limit: usize,

    /// Offset applied by paste/duplicate when no target position is given
    pub paste_offset: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            snap_to_grid: true,
            debounce_ms: 500,
            history_limit: 50,
            paste_offset: 20.0,
        }
    }
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::from_path(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
