//! Integration tests for the single-instance control path.

use crate::fixture::Fixture;
use ome_config::{save, WindowGeometry};
use ome_control::{
    serialize, tokenize, CommandDispatcher, Directive, Frontend, InstanceController,
    InstanceOptions, Launch, Session,
};
use ome_core::{AggregateState, PlaybackState};
use std::time::Duration;

#[derive(Default)]
struct HeadlessFrontend {
    geometry: WindowGeometry,
    shown: usize,
}

impl Frontend for HeadlessFrontend {
    fn minimize(&mut self) {}

    fn show(&mut self, _activate: bool) {
        self.shown += 1;
    }

    fn window(&self) -> WindowGeometry {
        self.geometry
    }

    fn set_window(&mut self, geometry: WindowGeometry) {
        self.geometry = geometry;
    }
}

fn loopback() -> InstanceOptions {
    InstanceOptions {
        addr: "127.0.0.1:0".parse().unwrap(),
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(2),
    }
}

#[test]
fn argument_protocol_examples() {
    assert_eq!(
        tokenize("load \"my file.json\" --minimize"),
        vec!["load", "my file.json", "--minimize"]
    );
    assert_eq!(serialize(&["a b", "c"]), "\"a b\" c");
    assert_eq!(tokenize(&serialize(&["a b", "c"])), vec!["a b", "c"]);
}

#[test]
fn second_instance_forwards_and_primary_pauses() {
    let fx = Fixture::new(&["rain.wav", "wind.wav"]);
    let rain = fx.id("rain.wav");
    let config_path = fx.path().join("config.json");

    // A config with one playing track.
    {
        let mut engine = fx.engine();
        engine.start_track(&rain).unwrap();
        save(&engine, WindowGeometry::default(), &config_path).unwrap();
    }

    // Instance A.
    let (tx, rx) = crossbeam_channel::unbounded();
    let a = InstanceController::new(loopback());
    let Launch::Primary(listener) = a.launch(&Directive::default(), tx).unwrap() else {
        panic!("first instance must acquire the token");
    };
    let mut session = Session::new(fx.engine(), HeadlessFrontend::default());

    // Instance B fails to acquire, forwards and is told to exit.
    let b = InstanceController::new(InstanceOptions {
        addr: listener.local_addr(),
        ..loopback()
    });
    let args = Directive::new([config_path.to_str().unwrap(), "--pause"]);
    let launch = b.launch(&args, crossbeam_channel::unbounded().0).unwrap();
    assert!(matches!(launch, Launch::Secondary));

    // A dispatches on its own thread.
    let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(received, args);
    let outcome = CommandDispatcher::dispatch(&mut session, &received);

    assert!(outcome.is_ok());
    assert_eq!(session.engine.track(&rain).unwrap().state(), PlaybackState::Paused);
    assert_eq!(session.engine.aggregate_state(), AggregateState::Paused);
    assert_eq!(session.config_path(), Some(config_path.as_path()));
}

#[test]
fn exit_directive_saves_to_loaded_config() {
    let fx = Fixture::new(&["rain.wav"]);
    let rain = fx.id("rain.wav");
    let config_path = fx.path().join("config.json");
    {
        let mut engine = fx.engine();
        engine.set_track_volume(&rain, 0.2).unwrap();
        save(&engine, WindowGeometry::default(), &config_path).unwrap();
    }

    let mut session = Session::new(fx.engine(), HeadlessFrontend::default());
    CommandDispatcher::dispatch(&mut session, &Directive::new([config_path.to_str().unwrap()]));
    session.engine.set_track_volume(&rain, 0.6).unwrap();
    session.engine.start_track(&rain).unwrap();

    CommandDispatcher::dispatch(&mut session, &Directive::new(["--exit", "--no-focus"]));
    assert!(session.exit_requested());
    assert_eq!(session.frontend.shown, 2);

    let written = session.shutdown().unwrap().unwrap();
    assert_eq!(fx.output.live_sessions(), 0);

    let saved = ome_config::load(&written).unwrap();
    assert_eq!(saved.tracks.len(), 1);
    assert!(saved.tracks[0].is_playing);
    assert!((saved.tracks[0].volume - 0.6).abs() < 1e-6);
}
