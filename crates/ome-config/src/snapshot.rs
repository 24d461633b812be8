//! Capturing and restoring mixer state.

use crate::document::{ConfigDocument, TrackConfig, WindowConfig};
use ome_audio::MixerEngine;
use ome_core::{clamp_volume, AudioSourceId, OmeError, PlaybackState};
use tracing::{debug, info, warn};

/// Row height and chrome used to size the window from the track count.
const ROW_HEIGHT: f64 = 52.0;
const CHROME_HEIGHT: f64 = 80.0;
const LABEL_WIDTH: f64 = 150.0;
const BUTTON_WIDTH: f64 = 75.0;
const SLIDER_WIDTH: f64 = 150.0;
const MARGIN_WIDTH: f64 = 30.0;

/// Position and size of the main window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGeometry {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl WindowGeometry {
    /// Default geometry fitting `tracks` rows, capped at `max_height`.
    pub fn for_track_count(tracks: usize, max_height: f64) -> Self {
        Self {
            width: LABEL_WIDTH + BUTTON_WIDTH + SLIDER_WIDTH + MARGIN_WIDTH,
            height: (ROW_HEIGHT * tracks as f64 + CHROME_HEIGHT).min(max_height),
            left: 0.0,
            top: 0.0,
        }
    }
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self::for_track_count(0, f64::MAX)
    }
}

/// One track's persisted configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub id: AudioSourceId,
    pub volume: f32,
    /// Paused counts as not playing.
    pub is_playing: bool,
}

/// Engine state captured for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub tracks: Vec<TrackSnapshot>,
    pub window: WindowGeometry,
    pub global_volume: f32,
}

impl From<ConfigDocument> for ConfigSnapshot {
    fn from(doc: ConfigDocument) -> Self {
        Self {
            tracks: doc
                .tracks
                .into_iter()
                .map(|t| TrackSnapshot {
                    id: t.file_path,
                    volume: t.volume,
                    is_playing: t.is_playing,
                })
                .collect(),
            window: WindowGeometry {
                width: doc.window.width,
                height: doc.window.height,
                left: doc.window.left,
                top: doc.window.top,
            },
            global_volume: doc.window.global_volume,
        }
    }
}

impl From<&ConfigSnapshot> for ConfigDocument {
    fn from(snapshot: &ConfigSnapshot) -> Self {
        Self {
            tracks: snapshot
                .tracks
                .iter()
                .map(|t| TrackConfig {
                    file_path: t.id.clone(),
                    is_playing: t.is_playing,
                    volume: t.volume,
                })
                .collect(),
            window: WindowConfig {
                width: snapshot.window.width,
                height: snapshot.window.height,
                left: snapshot.window.left,
                top: snapshot.window.top,
                global_volume: snapshot.global_volume,
            },
        }
    }
}

/// Capture every track that was started or given a volume since the last
/// reset, plus the global volume and window geometry.
pub fn snapshot(engine: &MixerEngine, window: WindowGeometry) -> ConfigSnapshot {
    let tracks = engine
        .track_list()
        .iter()
        .filter(|t| t.is_configured())
        .map(|t| TrackSnapshot {
            id: t.id().clone(),
            volume: t.volume(),
            is_playing: t.state() == PlaybackState::Playing,
        })
        .collect();

    ConfigSnapshot {
        tracks,
        window,
        global_volume: engine.global_volume(),
    }
}

/// Outcome of applying a snapshot.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub started: Vec<AudioSourceId>,
    /// Entries whose file is not in the current track list.
    pub skipped: Vec<AudioSourceId>,
    pub failed: Vec<(AudioSourceId, OmeError)>,
}

/// Destructively restore a snapshot: stop everything, reset volumes, then
/// re-establish each entry. Unknown tracks are skipped; a track that fails
/// to start stays Stopped without affecting the others.
pub fn apply(engine: &mut MixerEngine, snapshot: &ConfigSnapshot) -> ApplyReport {
    let mut report = ApplyReport::default();

    engine.reset_all();
    engine.set_global_volume(snapshot.global_volume);

    for entry in &snapshot.tracks {
        if !engine.contains(&entry.id) {
            debug!(track = %entry.id, "Config entry not in source folder, skipping");
            report.skipped.push(entry.id.clone());
            continue;
        }
        // The track is known, so setting its volume cannot fail.
        let _ = engine.set_track_volume(&entry.id, clamp_volume(entry.volume));

        if entry.is_playing {
            match engine.start_track(&entry.id) {
                Ok(()) => report.started.push(entry.id.clone()),
                Err(e) => {
                    warn!(track = %entry.id, error = %e, "Config track failed to start");
                    report.failed.push((entry.id.clone(), e));
                }
            }
        }
    }

    info!(
        started = report.started.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Applied config snapshot"
    );
    report
}
