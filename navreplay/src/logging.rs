//! Tracing subscriber setup.
//!
//! Console output goes to stderr. When a log directory is configured a
//! second layer writes to a daily-rolling file through a non-blocking
//! writer. `RUST_LOG` overrides the configured level.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// Errors from [`init_logging`].
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps background log writers alive. Buffered output is flushed on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self._file.is_some())
            .finish()
    }
}

/// Install the global subscriber.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&settings.level)?,
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false);

    let (file_layer, file_guard) = match &settings.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|source| LoggingError::Directory {
                path: directory.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(directory, &settings.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(ChronoLocal::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer);

    #[cfg(feature = "profiling")]
    let (registry, chrome_guard) = {
        let (chrome, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .include_args(true)
            .build();
        (registry.with(chrome), guard)
    };

    registry.try_init()?;

    Ok(LoggingGuard {
        _file: file_guard,
        #[cfg(feature = "profiling")]
        _chrome: chrome_guard,
    })
}

/// Parse a level or filter directives.
pub fn parse_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(filter).map_err(|source| LoggingError::Filter {
        filter: filter.to_string(),
        source,
    })
}
