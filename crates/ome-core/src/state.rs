//! Track identity and playback state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Canonical path of an audio file. Unique key for every per-track map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioSourceId(PathBuf);

impl AudioSourceId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name without extension, used as the display label.
    pub fn label(&self) -> String {
        self.0
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }
}

impl fmt::Display for AudioSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for AudioSourceId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for AudioSourceId {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Playback state of a single track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Transport state of the whole mixer, derived from the track states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl AggregateState {
    /// `Playing` if any track plays, else `Paused` if any is paused, else `Stopped`.
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = PlaybackState>,
    {
        let mut any_paused = false;
        for state in states {
            match state {
                PlaybackState::Playing => return AggregateState::Playing,
                PlaybackState::Paused => any_paused = true,
                PlaybackState::Stopped => {}
            }
        }
        if any_paused {
            AggregateState::Paused
        } else {
            AggregateState::Stopped
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateState::Stopped => "Stopped",
            AggregateState::Playing => "Playing",
            AggregateState::Paused => "Paused",
        }
    }
}

impl fmt::Display for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
