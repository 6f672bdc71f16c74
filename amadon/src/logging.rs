//! Logging setup.
//!
//! Events go to three places:
//! - the console (stderr), when enabled
//! - `amadon.log`, rotated daily, with every enabled event
//! - `amadon_errors.log`, errors only
//!
//! `RUST_LOG` takes precedence over the configured level.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, time::OffsetTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{ConfigFile, DEFAULT_LOG_LEVEL};

/// Main log file prefix.
pub const LOG_FILE_NAME: &str = "amadon.log";

/// Error-only log file.
pub const ERROR_LOG_FILE_NAME: &str = "amadon_errors.log";

/// Errors from logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for the log files.
    pub directory: PathBuf,
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    /// Also write to stderr.
    pub console: bool,
}

impl LoggingConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            level: DEFAULT_LOG_LEVEL.to_string(),
            console: true,
        }
    }

    /// Set the default level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable or disable console output.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }
}

impl From<&ConfigFile> for LoggingConfig {
    fn from(config: &ConfigFile) -> Self {
        LoggingConfig::new(&config.logging.directory).with_level(&config.logging.level)
    }
}

/// Keeps the background log writers alive; drop it on exit to flush.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _main: WorkerGuard,
    _errors: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log directory cannot be created, the level is not a valid
/// filter, or a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(&config.level)?;

    fs::create_dir_all(&config.directory).map_err(|source| LoggingError::CreateDir {
        path: config.directory.clone(),
        source,
    })?;

    let (main_writer, main_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.directory, LOG_FILE_NAME));
    let (error_writer, error_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&config.directory, ERROR_LOG_FILE_NAME),
    );

    // Must be read before other threads exist.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let console_layer = config.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(timer.clone())
    });

    let main_layer = fmt::layer()
        .with_writer(main_writer)
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_thread_names(true)
        .with_line_number(true);

    let error_layer = fmt::layer()
        .with_writer(error_writer)
        .with_ansi(false)
        .with_timer(timer)
        .with_line_number(true)
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(main_layer)
        .with(error_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing::debug!(directory = %config.directory.display(), "Logging initialized");

    Ok(LoggingGuard {
        _main: main_guard,
        _errors: error_guard,
    })
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}
