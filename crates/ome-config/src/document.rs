//! JSON wire shape of a config file.
//!
//! Field names are camelCase; the PascalCase names written by earlier
//! releases are accepted on read.

use ome_core::{AudioSourceId, OmeError, Result};
use serde::{Deserialize, Serialize};

/// One persisted track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackConfig {
    #[serde(alias = "FilePath")]
    pub file_path: AudioSourceId,
    #[serde(alias = "IsPlaying")]
    pub is_playing: bool,
    #[serde(alias = "Volume")]
    pub volume: f32,
}

fn default_global_volume() -> f32 {
    1.0
}

/// Persisted window geometry plus the global volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    #[serde(alias = "Width")]
    pub width: f64,
    #[serde(alias = "Height")]
    pub height: f64,
    #[serde(alias = "Left")]
    pub left: f64,
    #[serde(alias = "Top")]
    pub top: f64,
    #[serde(alias = "GlobalVolume", default = "default_global_volume")]
    pub global_volume: f32,
}

/// A whole config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(alias = "Tracks", default)]
    pub tracks: Vec<TrackConfig>,
    #[serde(alias = "Window")]
    pub window: WindowConfig,
}

impl ConfigDocument {
    /// Serialize to indented JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| OmeError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Parse a whole document. Nothing is applied until parsing succeeds.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| OmeError::Config(format!("Invalid config document: {}", e)))
    }
}
