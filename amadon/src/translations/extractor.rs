//! Archive extraction for translation packages.
//!
//! Translation archives are gzip files whose payload is either:
//! - a single stream holding one document, or
//! - a tar container holding a directory tree.
//!
//! The layout is not declared anywhere, so the decompressed payload is probed
//! as tar first and treated as a single stream when that fails.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use super::error::{TranslationError, TranslationResult};
use super::store::{ArchiveId, ArchiveStore};

/// Size of a tar header block.
const TAR_BLOCK_SIZE: usize = 512;

/// Byte range of the checksum field inside a tar header.
const TAR_CHECKSUM_RANGE: std::ops::Range<usize> = 148..156;

/// Detected payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// One document written as `TR###.txt`.
    SingleStream,
    /// Tar container unpacked member by member.
    Tar,
}

/// Outcome of an extraction.
#[derive(Debug, Clone)]
pub struct ExtractionSummary {
    /// Directory the archive was extracted into.
    pub target_dir: PathBuf,
    /// Layout detected for the payload.
    pub layout: PayloadLayout,
    /// Files written (or replaced) during this call.
    pub files_written: usize,
    /// Files left untouched because they already existed.
    pub files_skipped: usize,
}

/// A file member read out of a tar payload.
struct TarMember {
    path: PathBuf,
    data: Vec<u8>,
}

/// Extracts translation archives from an [`ArchiveStore`].
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    store: ArchiveStore,
}

impl ArchiveExtractor {
    /// Create an extractor for the given store.
    pub fn new(store: ArchiveStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    /// Extract `TR###.gz` into `TR###/` and return the target directory.
    ///
    /// Existing files are kept unless `overwrite` is set, so repeated calls
    /// never duplicate or destroy earlier output.
    pub fn extract_archive(&self, id: ArchiveId, overwrite: bool) -> TranslationResult<PathBuf> {
        self.extract_archive_with_summary(id, overwrite)
            .map(|summary| summary.target_dir)
    }

    /// Same as [`extract_archive`](Self::extract_archive) but reports what was
    /// written.
    pub fn extract_archive_with_summary(
        &self,
        id: ArchiveId,
        overwrite: bool,
    ) -> TranslationResult<ExtractionSummary> {
        let archive_path = self.store.archive_path(id);
        let compressed = read_archive(&archive_path)?;
        let target_dir = self.store.extraction_dir(id);
        unpack(id, &archive_path, &compressed, &target_dir, overwrite)
    }

    /// Decompress an archive and decode it as UTF-8 text.
    ///
    /// Intended for single-stream archives.
    pub fn extract_text(&self, id: ArchiveId) -> TranslationResult<String> {
        let archive_path = self.store.archive_path(id);
        let compressed = read_archive(&archive_path)?;
        let data = decompress(&archive_path, &compressed)?;
        String::from_utf8(data).map_err(|_| TranslationError::InvalidText { path: archive_path })
    }

    /// Write the decoded text of an archive to `TR###.txt`.
    ///
    /// The file goes into `out_dir`, or the sources directory when `None`.
    ///
    /// # Errors
    ///
    /// Returns `OutputExists` if the file is already there and `overwrite`
    /// is false.
    pub fn extract_to_file(
        &self,
        id: ArchiveId,
        out_dir: Option<&Path>,
        overwrite: bool,
    ) -> TranslationResult<PathBuf> {
        let text = self.extract_text(id)?;
        let target_dir = out_dir.unwrap_or_else(|| self.store.sources_dir());
        create_dir(target_dir)?;

        let out_path = target_dir.join(id.text_filename());
        if out_path.exists() && !overwrite {
            return Err(TranslationError::OutputExists { path: out_path });
        }

        write_file(&out_path, text.as_bytes())?;
        Ok(out_path)
    }
}

/// Unpack a gzip payload into `target_dir`.
///
/// `archive_path` is only used for error reporting.
pub fn unpack(
    id: ArchiveId,
    archive_path: &Path,
    compressed: &[u8],
    target_dir: &Path,
    overwrite: bool,
) -> TranslationResult<ExtractionSummary> {
    let data = decompress(archive_path, compressed)?;
    create_dir(target_dir)?;

    let summary = match read_tar_members(&data) {
        Some(members) => write_tar_members(archive_path, members, target_dir, overwrite)?,
        None => write_single_stream(id, &data, target_dir, overwrite)?,
    };

    tracing::debug!(
        archive = %id,
        layout = ?summary.layout,
        written = summary.files_written,
        skipped = summary.files_skipped,
        "Extracted archive"
    );

    Ok(summary)
}

fn read_archive(path: &Path) -> TranslationResult<Vec<u8>> {
    if !path.is_file() {
        return Err(TranslationError::ArchiveNotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read(path).map_err(|e| TranslationError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

fn decompress(path: &Path, compressed: &[u8]) -> TranslationResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| TranslationError::DecompressionFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(data)
}

/// Whether the first block is a tar header with a valid checksum.
fn has_tar_header(data: &[u8]) -> bool {
    if data.len() < TAR_BLOCK_SIZE {
        return false;
    }
    let block = &data[..TAR_BLOCK_SIZE];
    let header = tar::Header::from_byte_slice(block);
    let Ok(recorded) = header.cksum() else {
        return false;
    };

    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, byte)| {
            if TAR_CHECKSUM_RANGE.contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(*byte)
            }
        })
        .sum();

    recorded == computed
}

/// Parse every file member of a tar payload.
///
/// Returns `None` when the payload is not a well-formed tar stream, in which
/// case nothing has been written yet and the caller falls back to a single
/// stream.
fn read_tar_members(data: &[u8]) -> Option<Vec<TarMember>> {
    if !has_tar_header(data) {
        return None;
    }

    let mut archive = Archive::new(Cursor::new(data));
    let entries = archive.entries().ok()?;
    let mut members = Vec::new();

    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Payload is not a valid tar stream");
                return None;
            }
        };

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() || !entry_type.is_file() {
            continue;
        }

        let path = entry.path().ok()?.into_owned();
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer).ok()?;
        members.push(TarMember { path, data: buffer });
    }

    Some(members)
}

fn is_safe_member_path(path: &Path) -> bool {
    path.components().all(|component| {
        matches!(component, Component::Normal(_) | Component::CurDir)
    }) && path.components().any(|component| matches!(component, Component::Normal(_)))
}

fn write_tar_members(
    archive_path: &Path,
    members: Vec<TarMember>,
    target_dir: &Path,
    overwrite: bool,
) -> TranslationResult<ExtractionSummary> {
    let mut summary = ExtractionSummary {
        target_dir: target_dir.to_path_buf(),
        layout: PayloadLayout::Tar,
        files_written: 0,
        files_skipped: 0,
    };

    for member in members {
        if !is_safe_member_path(&member.path) {
            return Err(TranslationError::UnsafeMemberPath {
                archive: archive_path.to_path_buf(),
                member: member.path.display().to_string(),
            });
        }

        let out_path = target_dir.join(&member.path);
        if let Some(parent) = out_path.parent() {
            create_dir(parent)?;
        }

        if out_path.exists() && !overwrite {
            summary.files_skipped += 1;
            continue;
        }

        write_file(&out_path, &member.data)?;
        summary.files_written += 1;
    }

    Ok(summary)
}

fn write_single_stream(
    id: ArchiveId,
    data: &[u8],
    target_dir: &Path,
    overwrite: bool,
) -> TranslationResult<ExtractionSummary> {
    let out_path = target_dir.join(id.text_filename());
    let mut summary = ExtractionSummary {
        target_dir: target_dir.to_path_buf(),
        layout: PayloadLayout::SingleStream,
        files_written: 0,
        files_skipped: 0,
    };

    if out_path.exists() && !overwrite {
        summary.files_skipped = 1;
        return Ok(summary);
    }

    write_file(&out_path, data)?;
    summary.files_written = 1;
    Ok(summary)
}

fn create_dir(path: &Path) -> TranslationResult<()> {
    fs::create_dir_all(path).map_err(|e| TranslationError::CreateDirFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_file(path: &Path, data: &[u8]) -> TranslationResult<()> {
    fs::write(path, data).map_err(|e| TranslationError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
