//! Ome Audio - Looping playback engine
//!
//! Plays any number of audio files at once, each on its own endlessly
//! looping track, combined through a global volume.
//!
//! Architecture:
//! - `PcmSource`: finite seekable PCM capability (`MemorySource`, `FileSource`)
//! - `LoopingSource`: adapter that restarts its source at the end, counting loops
//! - `OutputBackend`: creates one device session per active track (cpal or null)
//! - `Track`: per-file lifecycle and volume
//! - `TelemetrySampler`: periodic loop/offset reporting per active track
//! - `MixerEngine`: top-level orchestrator

pub mod cpal_output;
pub mod decoder;
pub mod discovery;
pub mod engine;
pub mod looping;
pub mod output;
pub mod source;
pub mod telemetry;
pub mod track;

pub use cpal_output::CpalOutput;
pub use decoder::{FileOpener, FileSource, MemoryOpener, SourceOpener};
pub use discovery::{resolve_source_folder, scan_folder, SUPPORTED_EXTENSIONS};
pub use engine::{EngineOptions, MixerEngine};
pub use looping::{LoopProgress, LoopingSource};
pub use output::{DeviceSession, GainControl, NullOutput, OutputBackend, SessionFeed};
pub use source::{MemorySource, PcmFormat, PcmSource};
pub use telemetry::{TelemetrySampler, TrackTelemetry};
pub use track::{Track, TrackStatus};
