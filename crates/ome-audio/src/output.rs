//! Output device sessions.
//!
//! A track binds its looping source to one `DeviceSession` while it is
//! active. The session pulls audio through a `SessionFeed`, which applies
//! the track's effective gain from a lock-free `GainControl`.

use crate::looping::LoopingSource;
use crate::source::{PcmFormat, PcmSource};
use ome_core::{clamp_volume, AudioSourceId, OmeError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A looping source shared between its track and the device callback.
pub type SharedSource = Arc<Mutex<LoopingSource>>;

/// Effective gain shared with the device callback.
#[derive(Debug, Clone)]
pub struct GainControl(Arc<AtomicU32>);

impl GainControl {
    pub fn new(gain: f32) -> Self {
        Self(Arc::new(AtomicU32::new(clamp_volume(gain).to_bits())))
    }

    /// Store a new gain, clamped to `[0, 1]`.
    pub fn set(&self, gain: f32) {
        self.0.store(clamp_volume(gain).to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }
}

/// Latch that lets a session report only its first failure.
#[derive(Debug, Clone, Default)]
pub(crate) struct FirstFailure(Arc<AtomicBool>);

impl FirstFailure {
    /// `true` exactly once per latch, shared across clones.
    pub(crate) fn first(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }
}

/// What a device session renders from.
#[derive(Clone)]
pub struct SessionFeed {
    id: AudioSourceId,
    source: SharedSource,
    gain: GainControl,
    format: PcmFormat,
    failed: FirstFailure,
}

impl SessionFeed {
    pub fn new(id: AudioSourceId, source: SharedSource, gain: GainControl) -> Self {
        let format = source.lock().format();
        Self {
            id,
            source,
            gain,
            format,
            failed: FirstFailure::default(),
        }
    }

    pub fn id(&self) -> &AudioSourceId {
        &self.id
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Fill `out` with gain-scaled samples in the source's channel layout.
    ///
    /// Anything the source cannot supply is rendered as silence. A read
    /// error is logged once per session.
    pub fn render(&self, out: &mut [f32]) -> usize {
        let written = match self.source.lock().read(out) {
            Ok(n) => n,
            Err(e) => {
                if self.failed.first() {
                    warn!(track = %self.id, error = %e, "Track source failed, rendering silence");
                }
                0
            }
        };

        let gain = self.gain.get();
        for s in out[..written].iter_mut() {
            *s *= gain;
        }
        for s in out[written..].iter_mut() {
            *s = 0.0;
        }
        written
    }

    /// Render into a buffer laid out for `device_channels`.
    ///
    /// Mono sources are copied to every device channel; a mono device gets
    /// the average of the source channels; otherwise channels map by index
    /// and extra device channels stay silent.
    pub fn render_mapped(&self, out: &mut [f32], device_channels: u16, scratch: &mut Vec<f32>) {
        let src_channels = self.format.channels.max(1) as usize;
        let dev_channels = device_channels.max(1) as usize;
        if src_channels == dev_channels {
            self.render(out);
            return;
        }

        let frames = out.len() / dev_channels;
        scratch.resize(frames * src_channels, 0.0);
        self.render(scratch);

        for (frame, dst) in out.chunks_exact_mut(dev_channels).enumerate() {
            let src = &scratch[frame * src_channels..(frame + 1) * src_channels];
            if src_channels == 1 {
                dst.fill(src[0]);
            } else if dev_channels == 1 {
                dst[0] = src.iter().sum::<f32>() / src_channels as f32;
            } else {
                for (c, sample) in dst.iter_mut().enumerate() {
                    *sample = src.get(c).copied().unwrap_or(0.0);
                }
            }
        }
        for s in out[frames * dev_channels..].iter_mut() {
            *s = 0.0;
        }
    }
}

/// One live binding between a track and an output device.
pub trait DeviceSession {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    /// Halt rendering. Resources are released when the session is dropped.
    fn stop(&mut self);
}

/// Creates device sessions.
pub trait OutputBackend {
    fn open_session(&self, feed: SessionFeed) -> Result<Box<dyn DeviceSession>>;
}

struct NullSessionState {
    feed: SessionFeed,
    rendering: bool,
}

#[derive(Default)]
struct NullRegistry {
    sessions: HashMap<AudioSourceId, NullSessionState>,
    opened: usize,
}

/// Output backend with no device behind it.
///
/// Nothing is rendered unless a caller pulls audio through
/// [`NullOutput::render`]. Used for headless runs and in tests.
#[derive(Clone, Default)]
pub struct NullOutput {
    registry: Arc<Mutex<NullRegistry>>,
    unavailable: Arc<AtomicBool>,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `open_session` calls fail, like a missing device.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Release);
    }

    /// Pull `frames` frames from a track's session, if it has one.
    pub fn render(&self, id: &AudioSourceId, frames: usize) -> Option<Vec<f32>> {
        let feed = self.registry.lock().sessions.get(id)?.feed.clone();
        let mut out = vec![0.0f32; frames * feed.format().channels as usize];
        feed.render(&mut out);
        Some(out)
    }

    /// Gain currently applied to a track's session.
    pub fn gain(&self, id: &AudioSourceId) -> Option<f32> {
        self.registry.lock().sessions.get(id).map(|s| s.feed.gain())
    }

    /// Whether a track's session is running (not paused or stopped).
    pub fn is_rendering(&self, id: &AudioSourceId) -> Option<bool> {
        self.registry.lock().sessions.get(id).map(|s| s.rendering)
    }

    /// Number of sessions currently alive.
    pub fn live_sessions(&self) -> usize {
        self.registry.lock().sessions.len()
    }

    /// Number of sessions ever opened.
    pub fn opened_sessions(&self) -> usize {
        self.registry.lock().opened
    }
}

impl OutputBackend for NullOutput {
    fn open_session(&self, feed: SessionFeed) -> Result<Box<dyn DeviceSession>> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(OmeError::Device("no output device available".into()));
        }
        let id = feed.id().clone();
        let mut registry = self.registry.lock();
        registry.opened += 1;
        registry.sessions.insert(
            id.clone(),
            NullSessionState {
                feed,
                rendering: false,
            },
        );
        Ok(Box::new(NullSession {
            id,
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct NullSession {
    id: AudioSourceId,
    registry: Arc<Mutex<NullRegistry>>,
}

impl NullSession {
    fn set_rendering(&self, rendering: bool) {
        if let Some(state) = self.registry.lock().sessions.get_mut(&self.id) {
            state.rendering = rendering;
        }
    }
}

impl DeviceSession for NullSession {
    fn play(&mut self) -> Result<()> {
        self.set_rendering(true);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.set_rendering(false);
        Ok(())
    }

    fn stop(&mut self) {
        self.set_rendering(false);
    }
}

impl Drop for NullSession {
    fn drop(&mut self) {
        self.registry.lock().sessions.remove(&self.id);
    }
}
