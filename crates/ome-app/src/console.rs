//! Line-oriented console standing in for the window.

use ome_audio::TrackTelemetry;
use ome_config::WindowGeometry;
use ome_control::{tokenize, Frontend, Session};
use ome_core::{AggregateState, AudioSourceId, OmeError, Result, APP_NAME};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Tallest window the default geometry will ask for.
const MAX_WINDOW_HEIGHT: f64 = 900.0;

const HELP: &str = "\
commands:
  list                 show tracks
  play <n>             start track n
  stop <n>             stop track n
  volume <n> <0..1>    set track volume
  master <0..1>        set global volume
  pause | resume       pause or resume every track
  reset                stop everything, volumes back to default
  save [path]          save config (default: current config)
  load <path>          load config
  folder <path>        switch source folder
  quit";

/// Keeps the presentation state a window would: geometry, visibility and
/// the latest telemetry per track.
pub struct ConsoleFrontend<W: Write> {
    out: W,
    geometry: WindowGeometry,
    minimized: bool,
    telemetry: HashMap<AudioSourceId, TrackTelemetry>,
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            geometry: WindowGeometry::default(),
            minimized: false,
            telemetry: HashMap::new(),
        }
    }

    /// Record a telemetry sample. Zero samples mark a track as stopped.
    pub fn record(&mut self, sample: TrackTelemetry) {
        if sample.is_zero() {
            self.telemetry.remove(&sample.id);
        } else {
            self.telemetry.insert(sample.id.clone(), sample);
        }
    }

    pub fn telemetry(&self, id: &AudioSourceId) -> Option<&TrackTelemetry> {
        self.telemetry.get(id)
    }

    pub fn say(&mut self, text: impl std::fmt::Display) {
        // Console output is best effort.
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Frontend for ConsoleFrontend<W> {
    fn minimize(&mut self) {
        self.minimized = true;
        debug!("Window minimized");
    }

    fn show(&mut self, activate: bool) {
        if std::mem::take(&mut self.minimized) {
            debug!(activate, "Window restored");
        } else {
            debug!(activate, "Window shown");
        }
    }

    fn window(&self) -> WindowGeometry {
        self.geometry
    }

    fn set_window(&mut self, geometry: WindowGeometry) {
        self.geometry = geometry;
    }

    fn state_changed(&mut self, state: AggregateState) {
        self.say(format_args!("{} - {}", APP_NAME, state));
    }

    fn tracks_reloaded(&mut self, count: usize) {
        self.telemetry.clear();
        self.geometry = WindowGeometry {
            left: self.geometry.left,
            top: self.geometry.top,
            ..WindowGeometry::for_track_count(count, MAX_WINDOW_HEIGHT)
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    List,
    /// Track numbers are 1-based, as listed.
    Play(usize),
    Stop(usize),
    Volume(usize, f32),
    Master(f32),
    Pause,
    Resume,
    Reset,
    Save(Option<PathBuf>),
    Load(PathBuf),
    Folder(PathBuf),
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let tokens = tokenize(line);
        let Some((verb, rest)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match (verb.to_ascii_lowercase().as_str(), rest) {
            ("list" | "ls", []) => ConsoleCommand::List,
            ("play", [n]) => ConsoleCommand::Play(track_number(n)?),
            ("stop", [n]) => ConsoleCommand::Stop(track_number(n)?),
            ("volume" | "vol", [n, v]) => ConsoleCommand::Volume(track_number(n)?, level(v)?),
            ("master", [v]) => ConsoleCommand::Master(level(v)?),
            ("pause", []) => ConsoleCommand::Pause,
            ("resume", []) => ConsoleCommand::Resume,
            ("reset", []) => ConsoleCommand::Reset,
            ("save", []) => ConsoleCommand::Save(None),
            ("save", [path]) => ConsoleCommand::Save(Some(PathBuf::from(path))),
            ("load", [path]) => ConsoleCommand::Load(PathBuf::from(path)),
            ("folder", [path]) => ConsoleCommand::Folder(PathBuf::from(path)),
            ("help" | "?", []) => ConsoleCommand::Help,
            ("quit" | "exit", []) => ConsoleCommand::Quit,
            (verb, _) => return Err(format!("unknown command or arguments: {} (try help)", verb)),
        };
        Ok(Some(command))
    }
}

fn track_number(token: &str) -> std::result::Result<usize, String> {
    match token.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("not a track number: {}", token)),
    }
}

fn level(token: &str) -> std::result::Result<f32, String> {
    token
        .parse::<f32>()
        .map_err(|_| format!("not a volume: {}", token))
}

fn track_id<W: Write>(session: &Session<ConsoleFrontend<W>>, n: usize) -> Result<AudioSourceId> {
    session
        .engine
        .track_ids()
        .nth(n - 1)
        .cloned()
        .ok_or_else(|| OmeError::NotFound(format!("track {}", n)))
}

fn format_offset(offset: Duration) -> String {
    let secs = offset.as_secs();
    format!("{:02}:{:02}.{}", secs / 60, secs % 60, offset.subsec_millis() / 100)
}

/// Run one console command against the session.
pub fn execute<W: Write>(
    session: &mut Session<ConsoleFrontend<W>>,
    command: ConsoleCommand,
) -> Result<()> {
    match command {
        ConsoleCommand::List => {
            let rows: Vec<String> = session
                .engine
                .tracks()
                .enumerate()
                .map(|(i, status)| {
                    let (loops, offset) = session
                        .frontend
                        .telemetry(&status.id)
                        .map(|t| (t.loop_count, t.offset))
                        .unwrap_or((status.loop_count, status.offset));
                    format!(
                        "{:>3}. {:<24} {:<8} vol {:.2}  loops {:<4} at {}",
                        i + 1,
                        status.id.label(),
                        format!("{:?}", status.state),
                        status.volume,
                        loops,
                        format_offset(offset)
                    )
                })
                .collect();
            if rows.is_empty() {
                let folder = session.engine.source_folder().display().to_string();
                session.frontend.say(format_args!("no tracks in {}", folder));
            }
            for row in rows {
                session.frontend.say(row);
            }
            let master = session.engine.global_volume();
            session.frontend.say(format_args!("master {:.2}", master));
        }
        ConsoleCommand::Play(n) => {
            let id = track_id(session, n)?;
            session.engine.start_track(&id)?;
        }
        ConsoleCommand::Stop(n) => {
            let id = track_id(session, n)?;
            session.engine.stop_track(&id)?;
        }
        ConsoleCommand::Volume(n, v) => {
            let id = track_id(session, n)?;
            session.engine.set_track_volume(&id, v)?;
        }
        ConsoleCommand::Master(v) => session.engine.set_global_volume(v),
        ConsoleCommand::Pause => {
            session.engine.pause_all();
        }
        ConsoleCommand::Resume => {
            session.engine.resume_all();
        }
        ConsoleCommand::Reset => session.engine.reset_all(),
        ConsoleCommand::Save(path) => match session.save_config(path.as_deref())? {
            Some(written) => session.frontend.say(format_args!("saved {}", written.display())),
            None => session.frontend.say("no config path yet, use: save <path>"),
        },
        ConsoleCommand::Load(path) => {
            let report = session.load_config(&path)?;
            for (id, e) in &report.failed {
                session.frontend.say(format_args!("{}: {}", id.label(), e));
            }
        }
        ConsoleCommand::Folder(path) => {
            let count = session.rescan(&path)?;
            session.frontend.say(format_args!("{} tracks", count));
        }
        ConsoleCommand::Help => session.frontend.say(HELP),
        ConsoleCommand::Quit => session.request_exit(),
    }
    session.notify();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ome_audio::{EngineOptions, MemoryOpener, MixerEngine, NullOutput, PcmFormat};
    use ome_core::PlaybackState;

    fn session(dir: &std::path::Path) -> Session<ConsoleFrontend<Vec<u8>>> {
        for name in ["rain.wav", "wind.wav"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let engine = MixerEngine::new(
            Box::new(MemoryOpener::new(8, PcmFormat::new(8, 1))),
            Box::new(NullOutput::new()),
            EngineOptions {
                telemetry_period: Duration::from_millis(10),
                ..EngineOptions::default()
            },
        );
        let mut session = Session::new(engine, ConsoleFrontend::new(Vec::new()));
        session.rescan(dir).unwrap();
        session
    }

    fn run(session: &mut Session<ConsoleFrontend<Vec<u8>>>, line: &str) -> Result<()> {
        execute(session, ConsoleCommand::parse(line).unwrap().unwrap())
    }

    #[test]
    fn test_parse() {
        assert_eq!(ConsoleCommand::parse("  ").unwrap(), None);
        assert_eq!(ConsoleCommand::parse("play 2").unwrap(), Some(ConsoleCommand::Play(2)));
        assert_eq!(
            ConsoleCommand::parse("volume 1 0.25").unwrap(),
            Some(ConsoleCommand::Volume(1, 0.25))
        );
        assert_eq!(
            ConsoleCommand::parse("save \"my mix\"").unwrap(),
            Some(ConsoleCommand::Save(Some(PathBuf::from("my mix"))))
        );
        assert!(ConsoleCommand::parse("play 0").is_err());
        assert!(ConsoleCommand::parse("play").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[test]
    fn test_title_follows_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        run(&mut session, "play 1").unwrap();
        run(&mut session, "pause").unwrap();
        run(&mut session, "reset").unwrap();

        let out = String::from_utf8(session.frontend.into_inner()).unwrap();
        let titles: Vec<&str> = out.lines().collect();
        assert_eq!(titles, vec!["Ome - Stopped", "Ome - Playing", "Ome - Paused", "Ome - Stopped"]);
    }

    #[test]
    fn test_volume_and_unknown_track() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        let wind = AudioSourceId::new(dir.path().join("wind.wav"));
        let rain = AudioSourceId::new(dir.path().join("rain.wav"));
        let number = |id: &AudioSourceId, s: &Session<ConsoleFrontend<Vec<u8>>>| {
            s.engine.track_ids().position(|t| t == id).unwrap() + 1
        };
        let wind_n = number(&wind, &session);
        let rain_n = number(&rain, &session);

        run(&mut session, &format!("play {}", wind_n)).unwrap();
        run(&mut session, "master 0.5").unwrap();
        run(&mut session, &format!("volume {} 0.8", wind_n)).unwrap();
        assert!((session.engine.effective_gain(&wind).unwrap() - 0.4).abs() < 1e-6);

        // A stopped track keeps its volume without a live gain.
        run(&mut session, &format!("volume {} 0.3", rain_n)).unwrap();
        let stopped = session.engine.track(&rain).unwrap();
        assert_eq!(stopped.state(), PlaybackState::Stopped);
        assert!((stopped.volume() - 0.3).abs() < 1e-6);
        assert_eq!(session.engine.effective_gain(&rain), None);

        assert!(matches!(run(&mut session, "play 9"), Err(OmeError::NotFound(_))));
        assert_eq!(session.engine.track(&rain).unwrap().state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_save_needs_path_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        run(&mut session, "save").unwrap();
        assert!(session.config_path().is_none());

        let target = dir.path().join("mix");
        run(&mut session, &format!("save \"{}\"", target.display())).unwrap();
        assert!(dir.path().join("mix.json").is_file());
    }

    #[test]
    fn test_zero_telemetry_clears_cache() {
        let mut frontend = ConsoleFrontend::new(Vec::new());
        let id = AudioSourceId::from("rain.wav");
        frontend.record(TrackTelemetry {
            id: id.clone(),
            loop_count: 2,
            offset: Duration::from_millis(300),
        });
        assert_eq!(frontend.telemetry(&id).map(|t| t.loop_count), Some(2));

        frontend.record(TrackTelemetry::zero(id.clone()));
        assert!(frontend.telemetry(&id).is_none());
    }

    #[test]
    fn test_show_restores_minimized_window() {
        let mut frontend = ConsoleFrontend::new(Vec::new());
        frontend.minimize();
        assert!(frontend.minimized);
        frontend.show(false);
        assert!(!frontend.minimized);
    }

    #[test]
    fn test_reload_resizes_window() {
        let mut frontend = ConsoleFrontend::new(Vec::new());
        frontend.tracks_reloaded(3);
        assert_eq!(frontend.window().height, 52.0 * 3.0 + 80.0);
        frontend.tracks_reloaded(100);
        assert_eq!(frontend.window().height, MAX_WINDOW_HEIGHT);
    }
}
