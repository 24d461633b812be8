//! Looping adapter: turns a finite PCM source into an unbounded one.
//!
//! `LoopingSource` implements `PcmSource` itself, so anything that consumes
//! the raw capability works unmodified against the looped stream.
//!
//! One loop is counted per crossing of the end boundary. The adapter rewinds
//! as soon as the inner position reaches the source length, so the position
//! it reports always lies in `[0, len)`. A pull that yields nothing before
//! the nominal end (a decoder whose length estimate ran long) is also a
//! crossing. A pull that yields nothing at position 0 means the source cannot
//! produce audio at all; `read` then returns short instead of spinning.

use crate::source::{PcmFormat, PcmSource};
use ome_core::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Loop counter and position, readable from other threads without locking.
#[derive(Debug, Default)]
pub struct LoopProgress {
    loops: AtomicU64,
    position: AtomicU64,
}

impl LoopProgress {
    /// Completed wraparounds since the source was opened.
    pub fn loop_count(&self) -> u64 {
        self.loops.load(Ordering::Acquire)
    }

    /// Last published position in frames.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    fn set_position(&self, frame: u64) {
        self.position.store(frame, Ordering::Release);
    }

    fn record_loop(&self) {
        self.loops.fetch_add(1, Ordering::AcqRel);
    }
}

/// A PCM source that restarts at frame 0 whenever it runs out.
pub struct LoopingSource<S: PcmSource = Box<dyn PcmSource>> {
    inner: S,
    progress: Arc<LoopProgress>,
}

impl<S: PcmSource> LoopingSource<S> {
    pub fn new(inner: S) -> Self {
        let progress = Arc::new(LoopProgress::default());
        progress.set_position(inner.position());
        Self { inner, progress }
    }

    /// Shared handle for telemetry readers.
    pub fn progress(&self) -> Arc<LoopProgress> {
        Arc::clone(&self.progress)
    }

    pub fn loop_count(&self) -> u64 {
        self.progress.loop_count()
    }

    /// Playback offset, read straight from the inner source.
    pub fn current_offset(&self) -> Duration {
        self.inner.format().frames_to_duration(self.inner.position())
    }

    /// Seek by time. Never counts as a loop.
    pub fn set_current_offset(&mut self, offset: Duration) -> Result<()> {
        let frame = self.inner.format().duration_to_frames(offset);
        self.seek(frame)
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner.seek(0)?;
        self.progress.record_loop();
        Ok(())
    }
}

impl<S: PcmSource> PcmSource for LoopingSource<S> {
    fn format(&self) -> PcmFormat {
        self.inner.format()
    }

    fn len_frames(&self) -> u64 {
        self.inner.len_frames()
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let len = self.inner.len_frames();
        let target = if len == 0 { 0 } else { frame % len };
        self.inner.seek(target)?;
        self.progress.set_position(self.inner.position());
        Ok(())
    }

    fn read(&mut self, out: &mut [f32]) -> Result<usize> {
        let channels = self.inner.format().channels.max(1) as usize;
        let wanted = out.len() - out.len() % channels;
        let len = self.inner.len_frames();
        let mut written = 0;

        while written < wanted {
            let pulled = self.inner.read(&mut out[written..wanted])?;
            written += pulled;
            let position = self.inner.position();

            if pulled == 0 && position == 0 {
                // Nothing to loop over.
                break;
            }
            if pulled == 0 || position >= len {
                self.rewind()?;
            }
        }

        self.progress.set_position(self.inner.position());
        Ok(written)
    }
}
