//! The mixer engine: owns every track, the global volume and the source
//! folder, and exposes the aggregate transport operations.
//!
//! All mutation goes through `&mut self`, so the owner (the primary
//! execution context) serializes operations on the same track by
//! construction. Failures are recovered per operation: one track failing
//! to start or pause never affects its siblings.

use crate::cpal_output::CpalOutput;
use crate::decoder::{FileOpener, SourceOpener};
use crate::discovery;
use crate::output::OutputBackend;
use crate::telemetry::{TrackTelemetry, DEFAULT_SAMPLE_PERIOD};
use crate::track::{Track, TrackContext, TrackStatus};
use crossbeam_channel::{Receiver, Sender};
use ome_core::{clamp_volume, AggregateState, AudioSourceId, OmeError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Telemetry samples buffered for the owner before samplers start dropping.
pub const TELEMETRY_CAPACITY: usize = 1024;

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Period of the per-track telemetry sampler.
    pub telemetry_period: Duration,
    /// Global volume at startup.
    pub global_volume: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            telemetry_period: DEFAULT_SAMPLE_PERIOD,
            global_volume: 1.0,
        }
    }
}

/// Collection of looping tracks combined through a global volume.
pub struct MixerEngine {
    /// Insertion order is directory scan order.
    tracks: Vec<Track>,
    global_volume: f32,
    source_folder: PathBuf,
    opener: Box<dyn SourceOpener>,
    output: Box<dyn OutputBackend>,
    options: EngineOptions,
    telemetry_tx: Sender<TrackTelemetry>,
    telemetry_rx: Receiver<TrackTelemetry>,
}

impl MixerEngine {
    pub fn new(
        opener: Box<dyn SourceOpener>,
        output: Box<dyn OutputBackend>,
        options: EngineOptions,
    ) -> Self {
        let (telemetry_tx, telemetry_rx) = crossbeam_channel::bounded(TELEMETRY_CAPACITY);
        Self {
            tracks: Vec::new(),
            global_volume: clamp_volume(options.global_volume),
            source_folder: PathBuf::new(),
            opener,
            output,
            options,
            telemetry_tx,
            telemetry_rx,
        }
    }

    /// Engine decoding files from disk and playing on the default device.
    pub fn with_default_device(options: EngineOptions) -> Self {
        Self::new(Box::new(FileOpener), Box::new(CpalOutput::new()), options)
    }

    /// Telemetry published by the samplers of active tracks.
    ///
    /// The queue is bounded; samplers drop samples while it is full, so an
    /// owner that never drains it loses telemetry but not memory.
    pub fn telemetry(&self) -> Receiver<TrackTelemetry> {
        self.telemetry_rx.clone()
    }

    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track_ids(&self) -> impl Iterator<Item = &AudioSourceId> + '_ {
        self.tracks.iter().map(|t| t.id())
    }

    pub fn track_list(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: &AudioSourceId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn contains(&self, id: &AudioSourceId) -> bool {
        self.track(id).is_some()
    }

    /// Read-only views of every track, in scan order.
    pub fn tracks(&self) -> impl Iterator<Item = TrackStatus> + '_ {
        self.tracks.iter().map(|t| t.status())
    }

    fn track_mut(&mut self, id: &AudioSourceId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| OmeError::NotFound(format!("track {}", id)))
    }

    /// Register a Stopped track. Returns `false` if the id is already known.
    pub fn add_track(&mut self, id: AudioSourceId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.tracks.push(Track::new(id));
        true
    }

    pub fn start_track(&mut self, id: &AudioSourceId) -> Result<()> {
        let ctx = TrackContext {
            opener: self.opener.as_ref(),
            output: self.output.as_ref(),
            global_volume: self.global_volume,
            telemetry: &self.telemetry_tx,
            sample_period: self.options.telemetry_period,
        };
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| OmeError::NotFound(format!("track {}", id)))?;

        if let Err(e) = track.start(&ctx) {
            warn!(track = %id, error = %e, "Failed to start track");
            return Err(e);
        }
        Ok(())
    }

    /// Stop a track. Stopping a track that is not playing is a no-op.
    pub fn stop_track(&mut self, id: &AudioSourceId) -> Result<()> {
        self.track_mut(id)?.stop();
        Ok(())
    }

    /// Start every stopped track. Returns the ids that failed to start.
    pub fn play_all(&mut self) -> Vec<AudioSourceId> {
        let ids: Vec<AudioSourceId> = self.track_ids().cloned().collect();
        ids.into_iter()
            .filter(|id| self.start_track(id).is_err())
            .collect()
    }

    /// Pause every playing track. Returns how many were paused.
    pub fn pause_all(&mut self) -> usize {
        let mut paused = 0;
        for track in &mut self.tracks {
            match track.pause() {
                Ok(true) => paused += 1,
                Ok(false) => {}
                Err(e) => warn!(track = %track.id(), error = %e, "Failed to pause track"),
            }
        }
        info!(paused, "Paused all tracks");
        paused
    }

    /// Resume every paused track. Returns how many were resumed.
    pub fn resume_all(&mut self) -> usize {
        let mut resumed = 0;
        for track in &mut self.tracks {
            match track.resume() {
                Ok(true) => resumed += 1,
                Ok(false) => {}
                Err(e) => warn!(track = %track.id(), error = %e, "Failed to resume track"),
            }
        }
        info!(resumed, "Resumed all tracks");
        resumed
    }

    /// Stop every track, releasing all device sessions and file handles.
    pub fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }

    /// Stop everything and return every track to the default volume.
    pub fn reset_all(&mut self) {
        for track in &mut self.tracks {
            track.reset();
        }
        info!("Reset all tracks");
    }

    /// Clamp and store the global volume, re-applying it to live tracks.
    pub fn set_global_volume(&mut self, volume: f32) {
        self.global_volume = clamp_volume(volume);
        for track in &self.tracks {
            track.apply_gain(self.global_volume);
        }
    }

    pub fn set_track_volume(&mut self, id: &AudioSourceId, volume: f32) -> Result<()> {
        let global = self.global_volume;
        self.track_mut(id)?.set_volume(volume, global);
        Ok(())
    }

    /// Gain currently applied to a live track's device session.
    pub fn effective_gain(&self, id: &AudioSourceId) -> Option<f32> {
        self.track(id).and_then(|t| t.applied_gain())
    }

    pub fn aggregate_state(&self) -> AggregateState {
        AggregateState::from_states(self.tracks.iter().map(|t| t.state()))
    }

    /// Replace the track list with the supported files in `folder`.
    ///
    /// The folder is enumerated before anything is stopped, so a missing
    /// folder leaves the current tracks untouched.
    pub fn rescan_folder(&mut self, folder: impl AsRef<Path>) -> Result<usize> {
        let folder = folder.as_ref();
        let ids = discovery::scan_folder(folder)?;

        self.stop_all();
        self.tracks.clear();
        self.tracks.extend(ids.into_iter().map(Track::new));
        self.source_folder = folder.to_path_buf();

        info!(folder = %folder.display(), tracks = self.tracks.len(), "Loaded source folder");
        Ok(self.tracks.len())
    }
}

impl Drop for MixerEngine {
    fn drop(&mut self) {
        self.stop_all();
    }
}
