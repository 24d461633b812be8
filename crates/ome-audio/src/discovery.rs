//! Audio file discovery in the source folder.

use ome_core::{AudioSourceId, OmeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported extensions, in the order their groups appear in the track list.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["flac", "mp3", "wav"];

/// Subfolder tried when the base folder holds no supported files.
pub const FALLBACK_SUBFOLDER: &str = "Audio";

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

/// List supported files in `folder`, grouped by extension, keeping the
/// filesystem's enumeration order inside each group.
pub fn scan_folder(folder: &Path) -> Result<Vec<AudioSourceId>> {
    if !folder.is_dir() {
        return Err(OmeError::NotFound(format!(
            "source folder {}",
            folder.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    let ids: Vec<AudioSourceId> = SUPPORTED_EXTENSIONS
        .iter()
        .flat_map(|ext| files.iter().filter(move |p| has_extension(p, ext)))
        .cloned()
        .map(AudioSourceId::from)
        .collect();

    debug!(folder = %folder.display(), count = ids.len(), "Scanned source folder");
    Ok(ids)
}

/// Use `base` if it holds audio, else its `Audio` subfolder when present.
pub fn resolve_source_folder(base: &Path) -> PathBuf {
    let has_audio = scan_folder(base).map(|ids| !ids.is_empty()).unwrap_or(false);
    if has_audio {
        return base.to_path_buf();
    }
    let fallback = base.join(FALLBACK_SUBFOLDER);
    if fallback.is_dir() {
        fallback
    } else {
        base.to_path_buf()
    }
}
