//! A single looping track: its configured volume and, while active, the
//! reader, looping adapter, device session and telemetry sampler bound to it.

use crate::decoder::SourceOpener;
use crate::looping::{LoopProgress, LoopingSource};
use crate::output::{DeviceSession, GainControl, OutputBackend, SessionFeed, SharedSource};
use crate::source::{PcmFormat, PcmSource};
use crate::telemetry::{TelemetrySampler, TrackTelemetry};
use crossbeam_channel::Sender;
use ome_core::{clamp_volume, effective_gain, AudioSourceId, PlaybackState, Result, DEFAULT_VOLUME};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Collaborators a track needs to start playing.
pub struct TrackContext<'a> {
    pub opener: &'a dyn SourceOpener,
    pub output: &'a dyn OutputBackend,
    pub global_volume: f32,
    pub telemetry: &'a Sender<TrackTelemetry>,
    pub sample_period: Duration,
}

/// Read-only view of a track for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStatus {
    pub id: AudioSourceId,
    pub volume: f32,
    pub state: PlaybackState,
    pub loop_count: u64,
    pub offset: Duration,
}

/// Resources held while a track is Playing or Paused.
struct ActiveSession {
    device: Box<dyn DeviceSession>,
    sampler: TelemetrySampler,
    source: SharedSource,
    gain: GainControl,
    progress: Arc<LoopProgress>,
    format: PcmFormat,
}

impl ActiveSession {
    /// Release in order: device session, sampler, looping source (and the
    /// file reader it owns).
    fn shutdown(self) {
        let ActiveSession {
            mut device,
            sampler,
            source,
            ..
        } = self;
        device.stop();
        drop(device);
        sampler.cancel();
        drop(source);
    }
}

/// One audio file's playback session plus its configured volume.
pub struct Track {
    id: AudioSourceId,
    volume: f32,
    state: PlaybackState,
    session: Option<ActiveSession>,
    /// Started or given a volume since creation or the last reset.
    configured: bool,
}

impl Track {
    pub fn new(id: AudioSourceId) -> Self {
        Self {
            id,
            volume: DEFAULT_VOLUME,
            state: PlaybackState::Stopped,
            session: None,
            configured: false,
        }
    }

    pub fn id(&self) -> &AudioSourceId {
        &self.id
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Gain the device session applies, if the track is live.
    pub fn applied_gain(&self) -> Option<f32> {
        self.session.as_ref().map(|s| s.gain.get())
    }

    pub fn status(&self) -> TrackStatus {
        let (loop_count, offset) = match &self.session {
            Some(s) => (
                s.progress.loop_count(),
                s.format.frames_to_duration(s.progress.position()),
            ),
            None => (0, Duration::ZERO),
        };
        TrackStatus {
            id: self.id.clone(),
            volume: self.volume,
            state: self.state,
            loop_count,
            offset,
        }
    }

    /// Open the file fresh, wrap it in a looping source and start rendering.
    ///
    /// No-op if the track already holds a session. On failure every
    /// partially acquired resource is released and the track stays Stopped.
    pub fn start(&mut self, ctx: &TrackContext<'_>) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let reader = ctx.opener.open(&self.id)?;
        let looping = LoopingSource::new(reader);
        let progress = looping.progress();
        let format = looping.format();
        let source: SharedSource = Arc::new(Mutex::new(looping));
        let gain = GainControl::new(effective_gain(self.volume, ctx.global_volume));

        let feed = SessionFeed::new(self.id.clone(), Arc::clone(&source), gain.clone());
        let mut device = ctx.output.open_session(feed)?;
        let sampler = TelemetrySampler::spawn(
            self.id.clone(),
            Arc::clone(&progress),
            format,
            ctx.sample_period,
            ctx.telemetry.clone(),
        )?;
        device.play()?;

        self.session = Some(ActiveSession {
            device,
            sampler,
            source,
            gain,
            progress,
            format,
        });
        self.state = PlaybackState::Playing;
        self.configured = true;
        info!(track = %self.id, "Track started");
        Ok(())
    }

    /// Release the session. Safe to call on a stopped track.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown();
            info!(track = %self.id, "Track stopped");
        }
        self.state = PlaybackState::Stopped;
    }

    /// Pause a playing track. Returns whether the state changed.
    pub fn pause(&mut self) -> Result<bool> {
        match (&mut self.session, self.state) {
            (Some(session), PlaybackState::Playing) => {
                session.device.pause()?;
                self.state = PlaybackState::Paused;
                debug!(track = %self.id, "Track paused");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Resume a paused track. Returns whether the state changed.
    pub fn resume(&mut self) -> Result<bool> {
        match (&mut self.session, self.state) {
            (Some(session), PlaybackState::Paused) => {
                session.device.play()?;
                self.state = PlaybackState::Playing;
                debug!(track = %self.id, "Track resumed");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Store a new volume; a live session picks it up immediately.
    pub fn set_volume(&mut self, volume: f32, global_volume: f32) {
        self.volume = clamp_volume(volume);
        self.configured = true;
        self.apply_gain(global_volume);
    }

    /// Recompute the effective gain for a live session.
    pub fn apply_gain(&self, global_volume: f32) {
        if let Some(session) = &self.session {
            session.gain.set(effective_gain(self.volume, global_volume));
        }
    }

    /// Stop and return to the default volume.
    pub fn reset(&mut self) {
        self.stop();
        self.volume = DEFAULT_VOLUME;
        self.configured = false;
    }
}

impl Drop for Track {
    fn drop(&mut self) {
        self.stop();
    }
}
