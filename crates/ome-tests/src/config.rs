//! Integration tests for snapshot persistence.

use crate::fixture::Fixture;
use ome_config::{apply, load, save, snapshot, ConfigDocument, WindowGeometry};
use ome_core::PlaybackState;

#[test]
fn snapshot_apply_roundtrip_on_fresh_engine() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let a = fx.id("a.wav");
    let b = fx.id("b.wav");

    let mut engine = fx.engine();
    engine.set_global_volume(0.7);
    engine.set_track_volume(&a, 0.3).unwrap();
    engine.start_track(&a).unwrap();
    engine.set_track_volume(&b, 0.9).unwrap();
    let snap = snapshot(&engine, WindowGeometry::default());
    drop(engine);

    let mut fresh = fx.engine();
    let report = apply(&mut fresh, &snap);

    assert_eq!(report.started, vec![a.clone()]);
    assert!(report.failed.is_empty());
    let a_track = fresh.track(&a).unwrap();
    assert_eq!(a_track.state(), PlaybackState::Playing);
    assert!((a_track.volume() - 0.3).abs() < 1e-6);
    let b_track = fresh.track(&b).unwrap();
    assert_eq!(b_track.state(), PlaybackState::Stopped);
    assert!((b_track.volume() - 0.9).abs() < 1e-6);
    assert!((fresh.global_volume() - 0.7).abs() < 1e-6);
}

#[test]
fn saved_file_survives_missing_tracks() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let a = fx.id("a.wav");
    let b = fx.id("b.wav");

    let mut engine = fx.engine();
    engine.start_track(&a).unwrap();
    engine.start_track(&b).unwrap();
    let geometry = WindowGeometry::for_track_count(2, 600.0);
    let path = save(&engine, geometry, &fx.path().join("mix.cfg")).unwrap();
    drop(engine);
    assert_eq!(path, fx.path().join("mix.cfg.json"));

    std::fs::remove_file(b.path()).unwrap();
    let mut fresh = fx.engine();
    let snap = load(&path).unwrap();
    assert_eq!(snap.window.height, 52.0 * 2.0 + 80.0);

    let report = apply(&mut fresh, &snap);
    assert_eq!(report.skipped, vec![b]);
    assert_eq!(fresh.track(&a).unwrap().state(), PlaybackState::Playing);
}

#[test]
fn paused_tracks_persist_as_not_playing() {
    let fx = Fixture::new(&["a.wav"]);
    let a = fx.id("a.wav");
    let mut engine = fx.engine();
    engine.start_track(&a).unwrap();
    engine.pause_all();

    let doc = ConfigDocument::from(&snapshot(&engine, WindowGeometry::default()));
    assert_eq!(doc.tracks.len(), 1);
    assert!(!doc.tracks[0].is_playing);
}
