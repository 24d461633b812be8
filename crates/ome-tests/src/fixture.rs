//! Shared setup: a temp folder of placeholder files and an engine that
//! decodes them as short in-memory ramps.

use ome_audio::{EngineOptions, MemoryOpener, MixerEngine, NullOutput, PcmFormat};
use ome_core::AudioSourceId;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Eight frames of mono at 8 Hz: one loop per second of playback.
pub const FRAMES: usize = 8;
pub const FORMAT: PcmFormat = PcmFormat {
    sample_rate: 8,
    channels: 1,
};

pub struct Fixture {
    pub dir: TempDir,
    pub output: NullOutput,
}

impl Fixture {
    pub fn new(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        Self {
            dir,
            output: NullOutput::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn id(&self, name: &str) -> AudioSourceId {
        AudioSourceId::new(self.dir.path().join(name))
    }

    /// A fresh engine scanned onto the fixture folder, sharing the fixture's
    /// output registry.
    pub fn engine(&self) -> MixerEngine {
        let mut engine = MixerEngine::new(
            Box::new(MemoryOpener::new(FRAMES, FORMAT)),
            Box::new(self.output.clone()),
            EngineOptions {
                telemetry_period: Duration::from_millis(10),
                ..EngineOptions::default()
            },
        );
        engine.rescan_folder(self.path()).unwrap();
        engine
    }
}
