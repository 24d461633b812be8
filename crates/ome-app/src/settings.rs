//! Environment-driven application settings.

use ome_control::DEFAULT_PORT;
use std::path::PathBuf;
use tracing::warn;

const LOG_VAR: &str = "OME_LOG";
const PORT_VAR: &str = "OME_INSTANCE_PORT";
const SOUND_DIR_VAR: &str = "OME_SOUND_DIR";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `tracing` filter directive.
    pub log_filter: String,
    pub instance_port: u16,
    /// Base folder for audio discovery, before the subfolder fallback.
    pub sound_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_filter = lookup(LOG_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        // Invalid values are reported by `report_ignored` once logging is up.
        let instance_port = lookup(PORT_VAR)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let sound_dir = lookup(SOUND_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(executable_dir);

        Self {
            log_filter,
            instance_port,
            sound_dir,
        }
    }

    /// Warn about an unparsable port override. Call once logging is up.
    pub fn report_ignored(&self) {
        if let Ok(raw) = std::env::var(PORT_VAR) {
            if raw.trim().parse::<u16>().is_err() {
                warn!(value = %raw, default = DEFAULT_PORT, "Ignoring invalid {}", PORT_VAR);
            }
        }
    }
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
