//! Per-track telemetry sampling.
//!
//! Each active track gets one sampler thread that reads the track's
//! `LoopProgress` on a fixed period and pushes `TrackTelemetry` onto a
//! channel drained by the primary context. Samplers only read; they never
//! touch engine state. Cancelling a sampler publishes a zeroed sample so no
//! stale numbers remain visible after a stop.
//!
//! Publishing never blocks: while the channel is full, samples are dropped.

use crate::looping::LoopProgress;
use crate::source::PcmFormat;
use crossbeam_channel::{select, tick, Receiver, Sender, TrySendError};
use ome_core::{AudioSourceId, OmeError, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Default sampling period.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(500);

/// One observation of a track's loop progress.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTelemetry {
    pub id: AudioSourceId,
    pub loop_count: u64,
    pub offset: Duration,
}

impl TrackTelemetry {
    /// The reported state of a stopped track.
    pub fn zero(id: AudioSourceId) -> Self {
        Self {
            id,
            loop_count: 0,
            offset: Duration::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.loop_count == 0 && self.offset == Duration::ZERO
    }

    fn read(id: &AudioSourceId, progress: &LoopProgress, format: PcmFormat) -> Self {
        Self {
            id: id.clone(),
            loop_count: progress.loop_count(),
            offset: format.frames_to_duration(progress.position()),
        }
    }
}

/// Periodic sampler bound to one playing track.
pub struct TelemetrySampler {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TelemetrySampler {
    pub fn spawn(
        id: AudioSourceId,
        progress: Arc<LoopProgress>,
        format: PcmFormat,
        period: Duration,
        events: Sender<TrackTelemetry>,
    ) -> Result<Self> {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = std::thread::Builder::new()
            .name("ome-telemetry".into())
            .spawn(move || run(id, progress, format, period, events, cancel_rx))
            .map_err(|e| OmeError::Internal(format!("Failed to spawn telemetry sampler: {}", e)))?;

        Ok(Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Stop sampling and wait for the final zeroed sample to be published.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the cancel channel.
        self.cancel.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Telemetry sampler panicked");
            }
        }
    }
}

impl Drop for TelemetrySampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    id: AudioSourceId,
    progress: Arc<LoopProgress>,
    format: PcmFormat,
    period: Duration,
    events: Sender<TrackTelemetry>,
    cancel: Receiver<()>,
) {
    debug!(track = %id, "Telemetry sampler started");
    let ticker = tick(period);
    loop {
        select! {
            recv(ticker) -> _ => {
                match events.try_send(TrackTelemetry::read(&id, &progress, format)) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            recv(cancel) -> _ => break,
        }
    }
    let _ = events.try_send(TrackTelemetry::zero(id.clone()));
    debug!(track = %id, "Telemetry sampler stopped");
}
