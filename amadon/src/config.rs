//! Configuration file handling.
//!
//! Settings are stored in an INI file at `~/.config/amadon/config.ini` (or the
//! platform equivalent). The `AMADON_CONFIG` environment variable points to
//! another file.
//!
//! ```ini
//! [translations]
//! sources_dir = /home/me/.local/share/amadon/doc_sources
//! archive_base_url = https://example.com/translations
//! max_attempts = 3
//!
//! [logging]
//! level = info
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::translations::{RetryPolicy, TranslationsConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "AMADON_CONFIG";

const APP_DIR: &str = "amadon";
const CONFIG_FILENAME: &str = "config.ini";

const SECTION_TRANSLATIONS: &str = "translations";
const SECTION_LOGGING: &str = "logging";

/// Default delay before the first download retry, in milliseconds.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 2000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors from reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to write config {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),
}

/// `[translations]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationsSection {
    pub sources_dir: PathBuf,
    pub data_dir: PathBuf,
    pub packaged_catalog: Option<PathBuf>,
    pub archive_base_url: Option<String>,
    pub catalog_url: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSection {
    pub directory: PathBuf,
    pub level: String,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub translations: TranslationsSection,
    pub logging: LoggingSection,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            translations: TranslationsSection {
                sources_dir: data_dir.join("doc_sources"),
                data_dir: data_dir.clone(),
                packaged_catalog: None,
                archive_base_url: None,
                catalog_url: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            },
            logging: LoggingSection {
                directory: data_dir.join("logs"),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILENAME)
}

/// Default directory for downloaded data and logs.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl ConfigFile {
    /// Load from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section())).set(key.key_name(), value);
            }
        }
        ini.write_to_file(path).map_err(write_error)
    }

    /// Runtime configuration for the translation subsystem.
    pub fn translations_config(&self) -> TranslationsConfig {
        let section = &self.translations;
        let mut config = TranslationsConfig::new(&section.sources_dir, &section.data_dir)
            .with_timeout(Duration::from_secs(section.timeout_secs))
            .with_retry_policy(RetryPolicy::new(
                section.max_attempts,
                Duration::from_millis(section.backoff_base_ms),
            ));
        if let Some(path) = &section.packaged_catalog {
            config = config.with_packaged_catalog(path);
        }
        if let Some(url) = &section.archive_base_url {
            config = config.with_archive_base_url(url);
        }
        if let Some(url) = &section.catalog_url {
            config = config.with_catalog_url(url);
        }
        config
    }
}

/// A settable configuration key, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SourcesDir,
    DataDir,
    PackagedCatalog,
    ArchiveBaseUrl,
    CatalogUrl,
    TimeoutSecs,
    MaxAttempts,
    BackoffBaseMs,
    LogDirectory,
    LogLevel,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::SourcesDir,
            ConfigKey::DataDir,
            ConfigKey::PackagedCatalog,
            ConfigKey::ArchiveBaseUrl,
            ConfigKey::CatalogUrl,
            ConfigKey::TimeoutSecs,
            ConfigKey::MaxAttempts,
            ConfigKey::BackoffBaseMs,
            ConfigKey::LogDirectory,
            ConfigKey::LogLevel,
        ]
    }

    pub fn section(self) -> &'static str {
        match self {
            ConfigKey::LogDirectory | ConfigKey::LogLevel => SECTION_LOGGING,
            _ => SECTION_TRANSLATIONS,
        }
    }

    pub fn key_name(self) -> &'static str {
        match self {
            ConfigKey::SourcesDir => "sources_dir",
            ConfigKey::DataDir => "data_dir",
            ConfigKey::PackagedCatalog => "packaged_catalog",
            ConfigKey::ArchiveBaseUrl => "archive_base_url",
            ConfigKey::CatalogUrl => "catalog_url",
            ConfigKey::TimeoutSecs => "timeout_secs",
            ConfigKey::MaxAttempts => "max_attempts",
            ConfigKey::BackoffBaseMs => "backoff_base_ms",
            ConfigKey::LogDirectory => "directory",
            ConfigKey::LogLevel => "level",
        }
    }

    /// Full `section.key` name.
    pub fn name(self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty when unset.
    pub fn get(self, config: &ConfigFile) -> String {
        let t = &config.translations;
        let optional_path = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        match self {
            ConfigKey::SourcesDir => t.sources_dir.display().to_string(),
            ConfigKey::DataDir => t.data_dir.display().to_string(),
            ConfigKey::PackagedCatalog => optional_path(&t.packaged_catalog),
            ConfigKey::ArchiveBaseUrl => t.archive_base_url.clone().unwrap_or_default(),
            ConfigKey::CatalogUrl => t.catalog_url.clone().unwrap_or_default(),
            ConfigKey::TimeoutSecs => t.timeout_secs.to_string(),
            ConfigKey::MaxAttempts => t.max_attempts.to_string(),
            ConfigKey::BackoffBaseMs => t.backoff_base_ms.to_string(),
            ConfigKey::LogDirectory => config.logging.directory.display().to_string(),
            ConfigKey::LogLevel => config.logging.level.clone(),
        }
    }

    /// Validate and store a value. An empty value clears optional keys.
    pub fn set(self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        let t = &mut config.translations;

        match self {
            ConfigKey::SourcesDir => {
                t.sources_dir = required_path(value).ok_or_else(|| invalid("path required"))?
            }
            ConfigKey::DataDir => {
                t.data_dir = required_path(value).ok_or_else(|| invalid("path required"))?
            }
            ConfigKey::PackagedCatalog => t.packaged_catalog = optional(value).map(PathBuf::from),
            ConfigKey::ArchiveBaseUrl => {
                t.archive_base_url = optional(value)
                    .map(validate_url)
                    .transpose()
                    .map_err(invalid)?
            }
            ConfigKey::CatalogUrl => {
                t.catalog_url = optional(value)
                    .map(validate_url)
                    .transpose()
                    .map_err(invalid)?
            }
            ConfigKey::TimeoutSecs => {
                t.timeout_secs = value
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| invalid("expected a positive number of seconds"))?
            }
            ConfigKey::MaxAttempts => {
                t.max_attempts = value
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid("expected a positive integer"))?
            }
            ConfigKey::BackoffBaseMs => {
                t.backoff_base_ms = value
                    .parse()
                    .map_err(|_| invalid("expected milliseconds"))?
            }
            ConfigKey::LogDirectory => {
                config.logging.directory = required_path(value).ok_or_else(|| invalid("path required"))?
            }
            ConfigKey::LogLevel => {
                let level = value.to_lowercase();
                if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
                    return Err(invalid("expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn required_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn validate_url(url: String) -> Result<String, &'static str> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err("expected an http(s) URL")
    }
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.translations.max_attempts, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(
            &path,
            "[translations]\nsources_dir = /srv/doc_sources\narchive_base_url = https://example.com/tr\nmax_attempts = 5\n\n[logging]\nlevel = DEBUG\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();

        assert_eq!(config.translations.sources_dir, PathBuf::from("/srv/doc_sources"));
        assert_eq!(
            config.translations.archive_base_url.as_deref(),
            Some("https://example.com/tr")
        );
        assert_eq!(config.translations.max_attempts, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[translations]\nmax_attempts = lots\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");
        let mut config = ConfigFile::default();
        ConfigKey::CatalogUrl
            .set(&mut config, "https://example.com/translations.json")
            .unwrap();
        ConfigKey::TimeoutSecs.set(&mut config, "45").unwrap();

        config.save_to(&path).unwrap();
        let reloaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_config_key_parsing() {
        let key: ConfigKey = "translations.archive_base_url".parse().unwrap();
        assert_eq!(key, ConfigKey::ArchiveBaseUrl);
        assert_eq!("logging.level".parse::<ConfigKey>().unwrap(), ConfigKey::LogLevel);
        assert!("translations.nope".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_url_validation() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::ArchiveBaseUrl.set(&mut config, "ftp://x").is_err());
        ConfigKey::ArchiveBaseUrl.set(&mut config, "").unwrap();
        assert!(config.translations.archive_base_url.is_none());
    }

    #[test]
    fn test_translations_config_conversion() {
        let mut config = ConfigFile::default();
        ConfigKey::MaxAttempts.set(&mut config, "4").unwrap();
        ConfigKey::BackoffBaseMs.set(&mut config, "250").unwrap();

        let runtime = config.translations_config();

        assert_eq!(runtime.retry.max_attempts, 4);
        assert_eq!(runtime.retry.base_delay, Duration::from_millis(250));
        assert_eq!(runtime.sources_dir, config.translations.sources_dir);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
