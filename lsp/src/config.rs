//! Server configuration.
//!
//! One knob today: the per-request handler timeout. Loaded from
//! `~/.hxlink/config.toml` when present; anything unreadable falls back to
//! defaults with a warning (the server must come up regardless).

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_HANDLER_TIMEOUT_MS: u64 = 2_000;

/// Runtime configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline for a single request handler.
    pub handler_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            handler_timeout: Duration::from_millis(DEFAULT_HANDLER_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    handler_timeout_ms: Option<u64>,
}

impl ServerConfig {
    /// Load from the user's config file, falling back to defaults.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read config");
                return Self::default();
            }
        };
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Self::from_file(file),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to parse config");
                Self::default()
            }
        }
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Self::default();
        if let Some(ms) = file.handler_timeout_ms {
            config.handler_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// `~/.hxlink/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hxlink").join("config.toml"))
}
