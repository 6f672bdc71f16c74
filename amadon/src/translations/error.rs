//! Error types for the translation package subsystem.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for translation operations.
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Errors that can occur while resolving, fetching or extracting translations.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Archive identifier is negative or otherwise unusable.
    #[error("invalid archive identifier: {0}")]
    InvalidIdentifier(i64),

    /// No catalog candidate could be read and parsed.
    #[error("translation catalog unavailable (tried: {tried})")]
    CatalogUnavailable { tried: String },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Archive file is not present locally.
    #[error("archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    /// Gzip payload could not be decompressed.
    #[error("failed to decompress {}: {reason}", path.display())]
    DecompressionFailed { path: PathBuf, reason: String },

    /// A tar member would escape the extraction directory.
    #[error("unsafe member path in {}: {member}", archive.display())]
    UnsafeMemberPath { archive: PathBuf, member: String },

    /// Decompressed archive is not valid UTF-8 text.
    #[error("archive {} does not contain UTF-8 text", path.display())]
    InvalidText { path: PathBuf },

    /// Output file already exists and overwrite was not requested.
    #[error("output file already exists: {}", path.display())]
    OutputExists { path: PathBuf },

    /// Downloaded content does not match the catalog checksum.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// Server answered with a non-200 status.
    #[error("request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Connection or transfer failure.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Slot value is outside the catalog or not allowed for the slot.
    #[error("invalid value {value} for {slot}")]
    InvalidSlotValue { slot: String, value: i64 },

    /// Settings document could not be parsed or serialized.
    #[error("failed to parse settings {}: {reason}", path.display())]
    SettingsParseFailed { path: PathBuf, reason: String },

    /// A verification run is already in flight.
    #[error("a verification run is already in progress")]
    AlreadyRunning,

    /// The background worker thread could not be started.
    #[error("failed to start verification worker: {0}")]
    WorkerSpawnFailed(#[source] io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TranslationError {
    /// Whether this error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. } | Self::Timeout { .. } | Self::DownloadFailed { .. }
        )
    }
}
