//! Integration tests for the mixer engine.

use crate::fixture::{Fixture, FRAMES};
use ome_core::{AggregateState, PlaybackState, DEFAULT_VOLUME};
use std::time::Duration;

#[test]
fn effective_gain_composes_track_and_global() {
    let fx = Fixture::new(&["rain.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");

    engine.start_track(&rain).unwrap();
    engine.set_global_volume(0.5);
    engine.set_track_volume(&rain, 0.8).unwrap();

    assert!((engine.effective_gain(&rain).unwrap() - 0.4).abs() < 1e-6);
    // Applied to the live session immediately.
    assert!((fx.output.gain(&rain).unwrap() - 0.4).abs() < 1e-6);
}

#[test]
fn out_of_range_volumes_are_clamped() {
    let fx = Fixture::new(&["rain.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");

    engine.set_global_volume(3.0);
    engine.set_track_volume(&rain, -1.0).unwrap();

    assert_eq!(engine.global_volume(), 1.0);
    assert_eq!(engine.track(&rain).unwrap().volume(), 0.0);
}

#[test]
fn playback_loops_indefinitely() {
    let fx = Fixture::new(&["rain.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");
    engine.start_track(&rain).unwrap();

    // Two and a half passes over the source.
    let rendered = fx.output.render(&rain, FRAMES * 2 + FRAMES / 2).unwrap();
    assert_eq!(rendered.len(), FRAMES * 2 + FRAMES / 2);

    let status = engine.track(&rain).unwrap().status();
    assert_eq!(status.loop_count, 2);
    assert_eq!(status.offset, Duration::from_millis(500));
}

#[test]
fn reset_all_is_idempotent() {
    let fx = Fixture::new(&["rain.wav", "wind.wav", "fire.flac"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");
    let fire = fx.id("fire.flac");

    engine.start_track(&rain).unwrap();
    engine.start_track(&fire).unwrap();
    engine.set_track_volume(&fire, 0.9).unwrap();
    fx.output.render(&rain, FRAMES * 3).unwrap();
    engine.pause_all();

    for _ in 0..2 {
        engine.reset_all();
        for status in engine.tracks() {
            assert_eq!(status.state, PlaybackState::Stopped);
            assert_eq!(status.volume, DEFAULT_VOLUME);
            assert_eq!(status.loop_count, 0);
            assert_eq!(status.offset, Duration::ZERO);
        }
        assert_eq!(engine.aggregate_state(), AggregateState::Stopped);
        assert_eq!(fx.output.live_sessions(), 0);
    }
}

#[test]
fn stopping_a_never_started_track_is_a_noop() {
    let fx = Fixture::new(&["rain.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");

    engine.stop_track(&rain).unwrap();

    let track = engine.track(&rain).unwrap();
    assert_eq!(track.state(), PlaybackState::Stopped);
    assert!(!track.is_configured());
    assert_eq!(fx.output.opened_sessions(), 0);
}

#[test]
fn device_failure_leaves_siblings_alone() {
    let fx = Fixture::new(&["rain.wav", "wind.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");
    let wind = fx.id("wind.wav");

    engine.start_track(&rain).unwrap();
    fx.output.set_available(false);
    assert!(engine.start_track(&wind).is_err());

    assert_eq!(engine.track(&wind).unwrap().state(), PlaybackState::Stopped);
    assert_eq!(engine.track(&rain).unwrap().state(), PlaybackState::Playing);
    assert_eq!(engine.aggregate_state(), AggregateState::Playing);
}

#[test]
fn stopped_track_publishes_zero_telemetry() {
    let fx = Fixture::new(&["rain.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");
    let telemetry = engine.telemetry();

    engine.start_track(&rain).unwrap();
    fx.output.render(&rain, FRAMES + 1).unwrap();
    engine.stop_track(&rain).unwrap();

    // The last sample for a stopped track is always the zero sample.
    let last = telemetry
        .try_iter()
        .filter(|t| t.id == rain)
        .last()
        .unwrap();
    assert!(last.is_zero());
}

#[test]
fn rescan_of_missing_folder_keeps_tracks() {
    let fx = Fixture::new(&["rain.wav"]);
    let mut engine = fx.engine();
    let rain = fx.id("rain.wav");
    engine.start_track(&rain).unwrap();

    assert!(engine.rescan_folder(fx.path().join("nope")).is_err());

    assert_eq!(engine.track_count(), 1);
    assert_eq!(engine.track(&rain).unwrap().state(), PlaybackState::Playing);
}
