//! INI configuration file.
//!
//! Loaded from `<config_dir>/navreplay/config.ini`. Every key is optional;
//! a missing file yields the defaults.
//!
//! ```ini
//! [replay]
//! speed = 1.0
//!
//! [history]
//! timestamp_order = pass_through
//!
//! [logging]
//! level = info
//! directory = /var/log/navreplay
//! ```

use std::path::{Path, PathBuf};

use ini::{Ini, Properties};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::history::TimestampOrder;
use crate::replay::{MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};

/// Directory name under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "navreplay";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log file name prefix.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "navreplay.log";

/// Path of the configuration file.
///
/// Falls back to the working directory when the platform has no config
/// directory.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// `[replay]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    /// Playback speed multiplier.
    pub speed: f64,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

/// `[history]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySettings {
    /// Handling of records whose timestamp goes backwards.
    pub timestamp_order: TimestampOrder,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Level or filter directives, e.g. `info` or `navreplay=debug`.
    pub level: String,
    /// Directory for rolling log files. Console only when unset.
    pub directory: Option<PathBuf>,
    /// Log file name prefix.
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub replay: ReplaySettings,
    pub history: HistorySettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("replay")) {
            if let Some(value) = value_of(section, "speed") {
                config.replay.speed = parse_speed(value)?;
            }
        }

        if let Some(section) = ini.section(Some("history")) {
            if let Some(value) = value_of(section, "timestamp_order") {
                config.history.timestamp_order =
                    TimestampOrder::from_name(value).ok_or_else(|| ConfigError::InvalidValue {
                        section: "history",
                        key: "timestamp_order",
                        value: value.to_string(),
                        reason: "expected pass_through, reject or sort".to_string(),
                    })?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(value) = value_of(section, "level") {
                config.logging.level = parse_level(value)?;
            }
            if let Some(value) = value_of(section, "directory") {
                config.logging.directory = Some(expand_home(value));
            }
            if let Some(value) = value_of(section, "file_prefix") {
                config.logging.file_prefix = value.to_string();
            }
        }

        Ok(config)
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("replay"))
            .set("speed", self.replay.speed.to_string());
        ini.with_section(Some("history"))
            .set("timestamp_order", self.history.timestamp_order.name());

        let mut logging = ini.with_section(Some("logging"));
        logging
            .set("level", self.logging.level.as_str())
            .set("file_prefix", self.logging.file_prefix.as_str());
        if let Some(directory) = &self.logging.directory {
            logging.set("directory", directory.to_string_lossy().to_string());
        }
        ini
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }
}

/// Trimmed value with any trailing `;` comment removed. Empty values count as unset.
fn value_of<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    let raw = section.get(key)?;
    let value = raw.split(" ;").next().unwrap_or(raw).trim();
    (!value.is_empty()).then_some(value)
}

fn parse_speed(value: &str) -> Result<f64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        section: "replay",
        key: "speed",
        value: value.to_string(),
        reason,
    };
    let speed: f64 = value
        .parse()
        .map_err(|e: std::num::ParseFloatError| invalid(e.to_string()))?;
    if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&speed) {
        return Err(invalid(format!(
            "must be between {} and {}",
            MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED
        )));
    }
    Ok(speed)
}

fn parse_level(value: &str) -> Result<String, ConfigError> {
    // Filter directives are validated when logging starts
    if value.contains('=') || value.parse::<LevelFilter>().is_ok() {
        return Ok(value.to_string());
    }
    Err(ConfigError::InvalidValue {
        section: "logging",
        key: "level",
        value: value.to_string(),
        reason: "expected trace, debug, info, warn, error, off or filter directives".to_string(),
    })
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
