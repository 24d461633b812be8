//! The primary instance's session: the engine, the presentation layer and
//! the config file currently in use.

use ome_audio::MixerEngine;
use ome_config::{self as config, ApplyReport, WindowGeometry};
use ome_core::{AggregateState, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Presentation layer driven by the session.
///
/// Implementations are read-only projections of engine state; they never
/// hold tracks of their own.
pub trait Frontend {
    fn minimize(&mut self);

    /// Bring the window up, taking focus when `activate` is set.
    fn show(&mut self, activate: bool);

    fn window(&self) -> WindowGeometry;

    fn set_window(&mut self, geometry: WindowGeometry);

    /// Called when the aggregate state differs from the last one reported.
    fn state_changed(&mut self, _state: AggregateState) {}

    /// Called after the track list was replaced.
    fn tracks_reloaded(&mut self, _count: usize) {}
}

pub struct Session<F: Frontend> {
    pub engine: MixerEngine,
    pub frontend: F,
    config_path: Option<PathBuf>,
    last_state: Option<AggregateState>,
    exit_requested: bool,
}

impl<F: Frontend> Session<F> {
    pub fn new(engine: MixerEngine, frontend: F) -> Self {
        let mut session = Self {
            engine,
            frontend,
            config_path: None,
            last_state: None,
            exit_requested: false,
        };
        session.notify();
        session
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Replace the track list from `folder`. On failure nothing changes.
    pub fn rescan(&mut self, folder: &Path) -> Result<usize> {
        let count = self.engine.rescan_folder(folder)?;
        self.frontend.tracks_reloaded(count);
        self.notify();
        Ok(count)
    }

    /// Load and apply a config file, remembering it as the file to save
    /// to on shutdown.
    pub fn load_config(&mut self, path: &Path) -> Result<ApplyReport> {
        let (snapshot, report) = config::load_and_apply(&mut self.engine, path)?;
        self.frontend.set_window(snapshot.window);
        self.config_path = Some(path.to_path_buf());
        self.notify();
        Ok(report)
    }

    /// Save to `path`, or to the current config path. Returns the file
    /// written, or `None` when there was nowhere to save.
    pub fn save_config(&mut self, path: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(target) = path.or(self.config_path.as_deref()) else {
            return Ok(None);
        };
        let written = config::save(&self.engine, self.frontend.window(), target)?;
        self.config_path = Some(written.clone());
        Ok(Some(written))
    }

    /// Report the aggregate state to the frontend if it changed.
    pub fn notify(&mut self) {
        let state = self.engine.aggregate_state();
        if self.last_state != Some(state) {
            self.last_state = Some(state);
            self.frontend.state_changed(state);
        }
    }

    /// Orderly shutdown: capture the snapshot, stop every track, then
    /// write the snapshot to the current config path.
    pub fn shutdown(mut self) -> Result<Option<PathBuf>> {
        let snapshot = config::snapshot(&self.engine, self.frontend.window());
        self.engine.stop_all();

        let Some(path) = self.config_path.take() else {
            info!("No config path, nothing saved on exit");
            return Ok(None);
        };
        match config::write(&snapshot, &path) {
            Ok(written) => Ok(Some(written)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save config on exit");
                Err(e)
            }
        }
    }
}
