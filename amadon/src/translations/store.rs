//! Local archive store and naming conventions.
//!
//! This module is the single source of truth for translation archive naming:
//! - Archive filenames (e.g., `TR007.gz`)
//! - Extraction folders (e.g., `TR007/`)
//! - Single-stream text output (e.g., `TR007.txt`)
//!
//! The store itself only reads from the filesystem. Writes happen in the
//! extractor and the fetcher.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::checksum::{calculate_file_checksum, checksums_match};
use super::error::{TranslationError, TranslationResult};

/// Identifier of a translation archive.
///
/// Always non-negative; construct with [`ArchiveId::new`] from untrusted
/// input or with `From<u32>` when the value is already known to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveId(u32);

impl ArchiveId {
    /// Create an identifier, rejecting negative or out-of-range numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use amadon::translations::ArchiveId;
    ///
    /// assert_eq!(ArchiveId::new(7).unwrap().stem(), "TR007");
    /// assert!(ArchiveId::new(-1).is_err());
    /// ```
    pub fn new(value: i64) -> TranslationResult<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| TranslationError::InvalidIdentifier(value))
    }

    /// Raw numeric value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Zero-padded base name shared by all artifacts of this archive.
    ///
    /// Numbers above 999 keep all their digits.
    pub fn stem(self) -> String {
        format!("TR{:03}", self.0)
    }

    /// Filename of the compressed archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use amadon::translations::ArchiveId;
    ///
    /// assert_eq!(ArchiveId::from(44).archive_filename(), "TR044.gz");
    /// assert_eq!(ArchiveId::from(1234).archive_filename(), "TR1234.gz");
    /// ```
    pub fn archive_filename(self) -> String {
        format!("{}.gz", self.stem())
    }

    /// Filename used when a single-stream archive is written out as text.
    pub fn text_filename(self) -> String {
        format!("{}.txt", self.stem())
    }
}

impl From<u32> for ArchiveId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Filesystem view over the translation sources directory.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    sources_dir: PathBuf,
}

impl ArchiveStore {
    /// Create a store rooted at the given sources directory.
    pub fn new(sources_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources_dir: sources_dir.into(),
        }
    }

    /// Root directory holding archives and extraction folders.
    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    /// Path of the archive for a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` for negative identifiers, before any I/O.
    pub fn path_for(&self, id: i64) -> TranslationResult<PathBuf> {
        ArchiveId::new(id).map(|id| self.archive_path(id))
    }

    /// Path of the archive for a validated identifier.
    pub fn archive_path(&self, id: ArchiveId) -> PathBuf {
        self.sources_dir.join(id.archive_filename())
    }

    /// Directory that receives the extracted contents of an archive.
    pub fn extraction_dir(&self, id: ArchiveId) -> PathBuf {
        self.sources_dir.join(id.stem())
    }

    /// Whether the archive file exists.
    pub fn has_archive(&self, id: ArchiveId) -> bool {
        self.archive_path(id).is_file()
    }

    /// Whether the extraction folder exists and holds at least one entry.
    pub fn is_extracted(&self, id: ArchiveId) -> bool {
        fs::read_dir(self.extraction_dir(id))
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    /// MD5 digest of a file.
    pub fn checksum_of(&self, path: &Path) -> TranslationResult<String> {
        calculate_file_checksum(path)
    }

    /// Whether the local archive exists and matches the expected digest.
    ///
    /// With no expected digest, presence alone is enough.
    pub fn matches_checksum(&self, id: ArchiveId, expected: Option<&str>) -> TranslationResult<bool> {
        let path = self.archive_path(id);
        if !path.is_file() {
            return Ok(false);
        }
        match expected {
            Some(expected) => {
                let actual = self.checksum_of(&path)?;
                Ok(checksums_match(expected, &actual))
            }
            None => Ok(true),
        }
    }
}
