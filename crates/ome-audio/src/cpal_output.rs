//! Output sessions on the system's default device via cpal.
//!
//! Each session owns its own `cpal::Stream`, opened at the source's sample
//! rate. Sources whose rate the device cannot run are rejected rather than
//! played at the wrong speed.

use crate::output::{DeviceSession, FirstFailure, OutputBackend, SessionFeed};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig, SupportedStreamConfigRange};
use ome_core::{OmeError, Result};
use tracing::{debug, error};

/// Backend that opens one cpal stream per track on the default output device.
pub struct CpalOutput {
    host: cpal::Host,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick an f32 config that runs at `sample_rate`, preferring the source's
/// channel count, then stereo, then anything.
fn pick_config(
    device: &cpal::Device,
    sample_rate: u32,
    channels: u16,
) -> Result<StreamConfig> {
    let supported: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(|e| OmeError::Device(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0)
        .collect();

    let best = supported
        .iter()
        .find(|c| c.channels() == channels)
        .or_else(|| supported.iter().find(|c| c.channels() >= 2))
        .or_else(|| supported.first())
        .ok_or_else(|| {
            OmeError::Device(format!(
                "output device cannot play f32 audio at {} Hz",
                sample_rate
            ))
        })?;

    Ok(best
        .clone()
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .config())
}

impl OutputBackend for CpalOutput {
    fn open_session(&self, feed: SessionFeed) -> Result<Box<dyn DeviceSession>> {
        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| OmeError::Device("no default output device".into()))?;

        let format = feed.format();
        let config = pick_config(&device, format.sample_rate, format.channels)?;
        let device_channels = config.channels;

        debug!(
            track = %feed.id(),
            sample_rate = format.sample_rate,
            source_channels = format.channels,
            device_channels,
            "Opening output stream"
        );

        let err_id = feed.id().clone();
        let reported = FirstFailure::default();
        let mut scratch = Vec::new();
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    feed.render_mapped(data, device_channels, &mut scratch);
                },
                move |err| {
                    if reported.first() {
                        error!(track = %err_id, "Output stream error: {}", err);
                    }
                },
                None,
            )
            .map_err(|e| OmeError::Device(e.to_string()))?;

        Ok(Box::new(CpalSession { stream }))
    }
}

struct CpalSession {
    stream: Stream,
}

impl DeviceSession for CpalSession {
    fn play(&mut self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| OmeError::Device(e.to_string()))
    }

    fn pause(&mut self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| OmeError::Device(e.to_string()))
    }

    fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            debug!(error = %e, "Pausing stream on stop failed");
        }
    }
}
