//! CLI error type.

use std::fmt;

use navreplay::config::ConfigError;
use navreplay::history::HistoryError;
use navreplay::logging::LoggingError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid combination of arguments and configuration
    Config(String),
    /// The configuration file could not be loaded or saved
    ConfigFile(ConfigError),
    /// Logging could not be set up
    Logging(LoggingError),
    /// The history file could not be loaded or mapped
    History(HistoryError),
    /// The async runtime could not be started
    Runtime(std::io::Error),
    /// Output could not be produced
    Output(String),
    /// The Ctrl+C handler could not be installed
    Signal(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Logging setup failed: {}", e),
            CliError::History(e) => write!(f, "History error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::History(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Config(_) | CliError::Output(_) | CliError::Signal(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<HistoryError> for CliError {
    fn from(e: HistoryError) -> Self {
        CliError::History(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_history_error() {
        let err = CliError::from(HistoryError::InvalidDocument("not an array".into()));
        let text = err.to_string();
        assert!(text.starts_with("History error:"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_config_message() {
        let err = CliError::Config("speed out of range".into());
        assert_eq!(err.to_string(), "Configuration error: speed out of range");
    }
}
