//! Ome - ambient sound mixer.
//!
//! Entry point: single-instance launch, then the primary event loop.

mod console;
mod settings;

use anyhow::{Context, Result};
use console::{execute, ConsoleCommand, ConsoleFrontend};
use crossbeam_channel::{select, Receiver};
use ome_audio::{resolve_source_folder, EngineOptions, MixerEngine};
use ome_control::{
    CommandDispatcher, Directive, InstanceController, InstanceOptions, Launch, Session,
};
use settings::AppConfig;
use std::io::BufRead;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = AppConfig::from_env();

    // Initialize logging
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    config.report_ignored();

    let args = Directive::new(std::env::args().skip(1));
    let (directive_tx, directive_rx) = crossbeam_channel::unbounded();

    let controller = InstanceController::new(InstanceOptions::with_port(config.instance_port));
    let _listener = match controller
        .launch(&args, directive_tx)
        .context("Failed to acquire the instance token")?
    {
        Launch::Primary(listener) => listener,
        Launch::Secondary => return Ok(()),
    };

    info!("Ome starting...");

    let engine = MixerEngine::with_default_device(EngineOptions::default());
    let telemetry = engine.telemetry();
    let mut session = Session::new(engine, ConsoleFrontend::new(std::io::stdout()));

    let folder = resolve_source_folder(&config.sound_dir);
    if let Err(e) = session.rescan(&folder) {
        warn!(folder = %folder.display(), error = %e, "No sound folder, starting empty");
    }
    CommandDispatcher::dispatch(&mut session, &args);

    let console = spawn_console()?;
    run(&mut session, directive_rx, telemetry, console);

    info!("Shutting down");
    session.shutdown()?;
    Ok(())
}

/// Primary event loop. Every engine mutation happens here.
fn run(
    session: &mut Session<ConsoleFrontend<std::io::Stdout>>,
    directives: Receiver<Directive>,
    telemetry: Receiver<ome_audio::TrackTelemetry>,
    console: Receiver<String>,
) {
    let closed_directives = crossbeam_channel::never();
    let closed_console = crossbeam_channel::never();
    let mut directives_open = true;
    let mut console_open = true;

    while !session.exit_requested() {
        let directive_rx = if directives_open { &directives } else { &closed_directives };
        let console_rx = if console_open { &console } else { &closed_console };

        select! {
            recv(directive_rx) -> msg => match msg {
                Ok(directive) => {
                    let outcome = CommandDispatcher::dispatch(session, &directive);
                    for e in &outcome.errors {
                        session.frontend.say(format_args!("error: {}", e));
                    }
                }
                Err(_) => {
                    error!("Directive listener stopped");
                    directives_open = false;
                }
            },
            recv(telemetry) -> msg => {
                if let Ok(sample) = msg {
                    session.frontend.record(sample);
                }
            },
            recv(console_rx) -> msg => match msg {
                Ok(line) => match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if let Err(e) = execute(session, command) {
                            session.frontend.say(format_args!("error: {}", e));
                        }
                    }
                    Ok(None) => {}
                    Err(message) => session.frontend.say(message),
                },
                Err(_) => {
                    // Detached from a terminal; keep serving directives.
                    debug!("Console closed");
                    console_open = false;
                }
            },
        }
    }
}

/// Forward stdin lines to the event loop.
fn spawn_console() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("ome-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn console reader")?;
    Ok(rx)
}
