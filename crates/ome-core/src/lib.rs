//! Ome Core - Foundation types for the ambient mixer
//!
//! This crate provides the types shared by every other Ome crate:
//! - Error handling (`OmeError`, `Result`)
//! - Track identity (`AudioSourceId`)
//! - Playback states and their aggregation
//! - Volume clamping and the two-level gain model

pub mod error;
pub mod state;
pub mod volume;

pub use error::{OmeError, Result};
pub use state::{AggregateState, AudioSourceId, PlaybackState};
pub use volume::{clamp_volume, effective_gain, DEFAULT_VOLUME};

/// Name used for window titles and log lines.
pub const APP_NAME: &str = "Ome";
