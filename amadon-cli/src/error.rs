//! CLI error type.

use std::fmt;

use amadon::config::ConfigError;
use amadon::logging::LoggingError;
use amadon::translations::{ArchiveId, TranslationError};

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem (missing URL, bad key...).
    Config(String),
    /// Error from the translation subsystem.
    Translations(TranslationError),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// A verification run finished with failed archives.
    VerificationFailed(Vec<ArchiveId>),
    /// The background worker stopped without reporting.
    WorkerLost,
    /// Terminal interaction failed.
    Prompt(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Translations(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::VerificationFailed(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "Verification failed for: {}", ids.join(", "))
            }
            CliError::WorkerLost => write!(f, "Verification worker stopped without a report"),
            CliError::Prompt(msg) => write!(f, "Prompt failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Translations(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TranslationError> for CliError {
    fn from(e: TranslationError) -> Self {
        CliError::Translations(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        CliError::Prompt(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_failed_lists_archives() {
        let err = CliError::VerificationFailed(vec![ArchiveId::from(1), ArchiveId::from(12)]);
        assert_eq!(err.to_string(), "Verification failed for: TR001, TR012");
    }

    #[test]
    fn test_translation_error_is_source() {
        let err = CliError::from(TranslationError::AlreadyRunning);
        assert!(std::error::Error::source(&err).is_some());
    }
}
