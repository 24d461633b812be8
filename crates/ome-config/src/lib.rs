//! Ome Config - Mixer state persistence
//!
//! - `ConfigDocument`: the on-disk JSON shape
//! - `ConfigSnapshot`: what the engine state looks like at save time
//! - `snapshot` / `apply`: capture and destructively restore engine state
//! - `save` / `load`: file I/O with suffix normalization

pub mod document;
pub mod snapshot;
pub mod store;

pub use document::{ConfigDocument, TrackConfig, WindowConfig};
pub use snapshot::{apply, snapshot, ApplyReport, ConfigSnapshot, TrackSnapshot, WindowGeometry};
pub use store::{load, load_and_apply, normalize_path, save, write, CONFIG_EXTENSION};
