//! Reading and writing config files.

use crate::document::ConfigDocument;
use crate::snapshot::{apply, snapshot, ApplyReport, ConfigSnapshot, WindowGeometry};
use ome_audio::MixerEngine;
use ome_core::{OmeError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Suffix every saved config carries.
pub const CONFIG_EXTENSION: &str = "json";

/// Ensure `path` ends in `.json`: added when there is no extension,
/// appended when there is a different one.
pub fn normalize_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case(CONFIG_EXTENSION) => path.to_path_buf(),
        Some(_) => {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(CONFIG_EXTENSION);
            PathBuf::from(name)
        }
        None => path.with_extension(CONFIG_EXTENSION),
    }
}

/// Snapshot the engine and write it to `path` (normalized). Returns the
/// path actually written.
pub fn save(engine: &MixerEngine, window: WindowGeometry, path: &Path) -> Result<PathBuf> {
    write(&snapshot(engine, window), path)
}

/// Write an already captured snapshot to `path` (normalized).
pub fn write(snapshot: &ConfigSnapshot, path: &Path) -> Result<PathBuf> {
    let path = normalize_path(path);
    let doc = ConfigDocument::from(snapshot);
    std::fs::write(&path, doc.to_json()?)?;
    info!(path = %path.display(), tracks = doc.tracks.len(), "Saved config");
    Ok(path)
}

/// Read and parse a config file without touching any engine state.
///
/// Falls back to the normalized path when `path` itself does not exist.
pub fn load(path: &Path) -> Result<ConfigSnapshot> {
    let resolved = if path.is_file() {
        path.to_path_buf()
    } else {
        let normalized = normalize_path(path);
        if !normalized.is_file() {
            return Err(OmeError::NotFound(format!("config {}", path.display())));
        }
        normalized
    };

    let data = std::fs::read(&resolved)?;
    Ok(ConfigDocument::from_json(&data)?.into())
}

/// Load a config file and apply it. A file that cannot be read or parsed
/// leaves the engine untouched.
pub fn load_and_apply(
    engine: &mut MixerEngine,
    path: &Path,
) -> Result<(ConfigSnapshot, ApplyReport)> {
    let snapshot = load(path)?;
    let report = apply(engine, &snapshot);
    info!(path = %path.display(), "Loaded config");
    Ok((snapshot, report))
}
