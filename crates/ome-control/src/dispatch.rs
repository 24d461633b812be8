//! Mapping directives onto session operations.

use crate::directive::{Command, Directive};
use crate::session::{Frontend, Session};
use ome_core::OmeError;
use tracing::{debug, warn};

/// What a dispatch did, with the failures it recovered from.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub command: Command,
    pub errors: Vec<OmeError>,
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a directive against the session.
    ///
    /// Steps run in a fixed order regardless of token order: folder rescan,
    /// config load, pause, resume, window action, exit. A failing step is
    /// logged and recorded; later steps still run.
    pub fn dispatch<F: Frontend>(
        session: &mut Session<F>,
        directive: &Directive,
    ) -> DispatchOutcome {
        let command = Command::parse(directive);
        let mut errors = Vec::new();
        debug!(?command, "Dispatching directive");

        if let Some(folder) = &command.source_folder {
            if let Err(e) = session.rescan(folder) {
                warn!(folder = %folder.display(), error = %e, "Source folder change failed");
                errors.push(e);
            }
        }

        if let Some(path) = &command.config_path {
            match session.load_config(path) {
                Ok(report) => errors.extend(report.failed.into_iter().map(|(_, e)| e)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Config load failed");
                    errors.push(e);
                }
            }
        }

        if command.pause {
            session.engine.pause_all();
        }
        if command.resume {
            session.engine.resume_all();
        }

        if command.minimize {
            session.frontend.minimize();
        } else {
            session.frontend.show(!command.no_focus);
        }

        if command.exit {
            session.request_exit();
        }

        session.notify();
        DispatchOutcome { command, errors }
    }
}
