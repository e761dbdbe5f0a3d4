//! Session configuration loaded from TOML.

use crate::channel::DEFAULT_PORT;
use crate::session::DEFAULT_CLOCK_BUDGET;
use derive_getters::Getters;
use derive_more::{Display, Error};
use peer_chess_rules::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Settings for one peer.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Display name sent to the peer. Defaults to the color name.
    #[serde(default)]
    name: Option<String>,

    /// TCP port to listen on or dial.
    #[serde(default = "default_port")]
    port: u16,

    /// Starting time per side, in ticks.
    #[serde(default = "default_clock_budget")]
    clock_budget: u32,

    /// Milliseconds between clock ticks.
    #[serde(default = "default_tick_millis")]
    tick_millis: u64,

    /// Re-check every move the peer reports.
    #[serde(default)]
    verify_peer_moves: bool,

    /// Where tracing output goes.
    #[serde(default = "default_log_file")]
    log_file: PathBuf,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_clock_budget() -> u32 {
    DEFAULT_CLOCK_BUDGET
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_log_file() -> PathBuf {
    PathBuf::from("peer_chess.log")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: None,
            port: default_port(),
            clock_budget: default_clock_budget(),
            tick_millis: default_tick_millis(),
            verify_peer_moves: false,
            log_file: default_log_file(),
        }
    }
}

impl SessionConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {e}")))?;
        let config = Self::from_toml(&content)?;
        info!(port = config.port, clock_budget = config.clock_budget, "Config loaded");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            debug!("No config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_budget == 0 {
            return Err(ConfigError::new("clock_budget must be at least 1"));
        }
        if self.tick_millis == 0 {
            return Err(ConfigError::new("tick_millis must be at least 1"));
        }
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::new("name must not be empty"));
        }
        Ok(())
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn with_overrides(
        mut self,
        name: Option<String>,
        port: Option<u16>,
        verify_peer_moves: bool,
    ) -> Result<Self, ConfigError> {
        if name.is_some() {
            self.name = name;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self.verify_peer_moves |= verify_peer_moves;
        self.validate()?;
        Ok(self)
    }

    /// Interval between clock ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Name shown to the peer when playing `color`.
    pub fn display_name(&self, color: Color) -> String {
        self.name.clone().unwrap_or_else(|| color.to_string())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let config = SessionConfig::default();
        assert_eq!(*config.port(), 55555);
        assert_eq!(*config.clock_budget(), 600);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(!*config.verify_peer_moves());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = SessionConfig::from_toml("name = \"Alice\"\nclock_budget = 60\n")
            .expect("valid config");
        assert_eq!(config.name().as_deref(), Some("Alice"));
        assert_eq!(*config.clock_budget(), 60);
        assert_eq!(*config.port(), 55555);
    }

    #[test]
    fn test_zero_clock_rejected() {
        let err = SessionConfig::from_toml("clock_budget = 0").unwrap_err();
        assert!(err.message.contains("clock_budget"));
    }

    #[test]
    fn test_display_name_falls_back_to_color() {
        let config = SessionConfig::default();
        assert_eq!(config.display_name(Color::White), "White");
        assert_eq!(config.display_name(Color::Black), "Black");
    }

    #[test]
    fn test_overrides_win() {
        let config = SessionConfig::default()
            .with_overrides(Some("Bob".into()), Some(4000), true)
            .expect("valid overrides");
        assert_eq!(config.display_name(Color::Black), "Bob");
        assert_eq!(*config.port(), 4000);
        assert!(*config.verify_peer_moves());
    }

    #[test]
    fn test_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "port = 6000\nverify_peer_moves = true").expect("write");
        let config = SessionConfig::from_file(file.path()).expect("load");
        assert_eq!(*config.port(), 6000);
        assert!(*config.verify_peer_moves());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = SessionConfig::load_or_default("/nonexistent/peer_chess.toml")
            .expect("defaults");
        assert_eq!(config, SessionConfig::default());
    }
}
