//! The "finite seekable PCM source" capability.
//!
//! Positions and lengths are counted in frames (one sample per channel).
//! `read` fills interleaved `f32` samples and always returns a whole
//! number of frames.

use ome_core::{OmeError, Result};
use std::time::Duration;

/// Sample layout of a PCM source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Convert a frame count into wall-clock time.
    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// Convert wall-clock time into a frame count (rounded down).
    pub fn duration_to_frames(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.sample_rate as f64) as u64
    }
}

/// A finite, seekable stream of interleaved PCM samples.
pub trait PcmSource: Send {
    fn format(&self) -> PcmFormat;

    /// Total length in frames.
    fn len_frames(&self) -> u64;

    /// Current read position in frames.
    fn position(&self) -> u64;

    /// Move the read position. Positions past the end clamp to the end.
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Fill `out` with samples from the current position.
    ///
    /// Returns the number of samples written; `0` means end of stream.
    fn read(&mut self, out: &mut [f32]) -> Result<usize>;

    fn is_empty(&self) -> bool {
        self.len_frames() == 0
    }
}

impl<S: PcmSource + ?Sized> PcmSource for Box<S> {
    fn format(&self) -> PcmFormat {
        (**self).format()
    }

    fn len_frames(&self) -> u64 {
        (**self).len_frames()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        (**self).seek(frame)
    }

    fn read(&mut self, out: &mut [f32]) -> Result<usize> {
        (**self).read(out)
    }
}

/// A PCM source backed by a sample vector.
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<f32>,
    format: PcmFormat,
    position: u64,
}

impl MemorySource {
    /// Wrap interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, format: PcmFormat) -> Result<Self> {
        if format.channels == 0 {
            return Err(OmeError::InvalidParameter(
                "PCM source needs at least one channel".into(),
            ));
        }
        let channels = format.channels as usize;
        samples.truncate(samples.len() - samples.len() % channels);
        Ok(Self {
            samples,
            format,
            position: 0,
        })
    }

    /// A ramp of `frames` frames: sample value equals its frame index.
    pub fn ramp(frames: usize, format: PcmFormat) -> Result<Self> {
        let channels = format.channels.max(1) as usize;
        let samples = (0..frames)
            .flat_map(|frame| std::iter::repeat(frame as f32).take(channels))
            .collect();
        Self::new(samples, format)
    }
}

impl PcmSource for MemorySource {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn len_frames(&self) -> u64 {
        (self.samples.len() / self.format.channels as usize) as u64
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        self.position = frame.min(self.len_frames());
        Ok(())
    }

    fn read(&mut self, out: &mut [f32]) -> Result<usize> {
        let channels = self.format.channels as usize;
        let start = self.position as usize * channels;
        let remaining = self.samples.len() - start;
        let count = (out.len() - out.len() % channels).min(remaining);
        out[..count].copy_from_slice(&self.samples[start..start + count]);
        self.position += (count / channels) as u64;
        Ok(count)
    }
}
