//! Configuration for the performance monitor.

use crate::collector::fps::DEFAULT_SAMPLE_INTERVAL;
use crate::collector::interaction::DEFAULT_INTERACTION_EVENTS;
use crate::core::windowing::DEFAULT_SESSION_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Idle time after the last activity before a session closes
    #[serde(with = "duration_ms")]
    pub session_timeout: Duration,

    /// Instrument network requests
    pub track_network: bool,

    /// Observe main-thread long tasks
    pub track_long_tasks: bool,

    /// Sample frame rate
    pub track_fps: bool,

    /// Time between FPS samples
    #[serde(with = "duration_ms")]
    pub fps_sample_interval: Duration,

    /// Input event types that start a session
    pub interaction_events: Vec<String>,

    /// Forward sessions to an external inspector
    pub relay_sessions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            track_network: true,
            track_long_tasks: true,
            track_fps: true,
            fps_sample_interval: DEFAULT_SAMPLE_INTERVAL,
            interaction_events: DEFAULT_INTERACTION_EVENTS
                .iter()
                .map(|event| event.to_string())
                .collect(),
            relay_sessions: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or the defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("perf-hud")
            .join("config.json")
    }

    /// Apply a timeout override given in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        if let Some(ms) = timeout_ms {
            self.session_timeout = Duration::from_millis(ms);
        }
        self
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
