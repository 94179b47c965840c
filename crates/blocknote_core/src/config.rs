//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe database, logging and placeholder display settings.
//! - Load settings from a JSON file with every field defaulted.
//!
//! # Invariants
//! - Display bounds and fallback sizes are strictly positive after `validate()`.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Placeholder footprint settings, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Maximum footprint width of any placeholder.
    pub max_width: u32,
    /// Maximum footprint height of any placeholder.
    pub max_height: u32,
    /// Image footprint when pixel dimensions are unknown.
    pub fallback_image_width: u32,
    pub fallback_image_height: u32,
    /// Fixed audio glyph footprint.
    pub audio_width: u32,
    pub audio_height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            fallback_image_width: 200,
            fallback_image_height: 150,
            audio_width: 800,
            audio_height: 160,
        }
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("display.max_width", self.max_width),
            ("display.max_height", self.max_height),
            ("display.fallback_image_width", self.fallback_image_width),
            ("display.fallback_image_height", self.fallback_image_height),
            ("display.audio_width", self.audio_width),
            ("display.audio_height", self.audio_height),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Top-level configuration consumed by hosts and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file path. An in-memory database is used when absent.
    pub database_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs. Logging stays off when absent.
    pub log_dir: Option<PathBuf>,
    pub display: DisplayConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            display: DisplayConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_json_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty".to_string()));
        }
        self.display.validate()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
