//! Removal of regenerable files.
//!
//! Logs, extraction folders and leftover partial downloads can all be
//! recreated, so they are safe to delete. Archives (`TR###.gz`), the catalog
//! and settings are never touched.

use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{ERROR_LOG_FILE_NAME, LOG_FILE_NAME};

/// What a cleanup target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A log file (`amadon.log*`, `amadon_errors.log`).
    Logs,
    /// A `TR###/` extraction folder.
    Extraction,
    /// A `.TR###.gz.part` temporary download.
    PartialDownload,
}

/// A file or directory that would be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
    /// Total size in bytes.
    pub bytes: u64,
}

/// Outcome of [`remove_targets`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    pub removed: usize,
    pub bytes_freed: u64,
    /// Targets that could not be removed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// List what can be removed under the sources and log directories.
///
/// Only the log files themselves are listed, never the log directory, so a
/// log directory shared with data is safe to clean.
pub fn find_targets(sources_dir: &Path, log_dir: &Path) -> Vec<CleanupTarget> {
    let mut targets = log_files(log_dir);
    targets.extend(source_targets(sources_dir));
    targets
}

fn log_files(log_dir: &Path) -> Vec<CleanupTarget> {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return Vec::new();
    };

    let mut found: Vec<CleanupTarget> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            entry.path().is_file()
                && (name.starts_with(LOG_FILE_NAME) || name == ERROR_LOG_FILE_NAME)
        })
        .map(|entry| CleanupTarget {
            bytes: size_of(&entry.path()),
            path: entry.path(),
            kind: TargetKind::Logs,
        })
        .collect();

    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

fn source_targets(sources_dir: &Path) -> Vec<CleanupTarget> {
    let Ok(entries) = fs::read_dir(sources_dir) else {
        return Vec::new();
    };

    let mut found: Vec<CleanupTarget> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let kind = if path.is_dir() && is_archive_stem(&name) {
                TargetKind::Extraction
            } else if path.is_file() && name.starts_with('.') && name.ends_with(".part") {
                TargetKind::PartialDownload
            } else {
                return None;
            };
            Some(CleanupTarget {
                bytes: size_of(&path),
                path,
                kind,
            })
        })
        .collect();

    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

/// Delete the given targets, continuing past failures.
pub fn remove_targets(targets: &[CleanupTarget]) -> CleanupResult {
    let mut result = CleanupResult::default();

    for target in targets {
        let removal = if target.path.is_dir() {
            fs::remove_dir_all(&target.path)
        } else {
            fs::remove_file(&target.path)
        };

        match removal {
            Ok(()) => {
                tracing::info!(path = %target.path.display(), bytes = target.bytes, "Removed");
                result.removed += 1;
                result.bytes_freed += target.bytes;
            }
            Err(e) => {
                tracing::warn!(path = %target.path.display(), error = %e, "Could not remove");
                result.failures.push((target.path.clone(), e.to_string()));
            }
        }
    }

    result
}

/// `TR` followed by at least three digits.
fn is_archive_stem(name: &str) -> bool {
    name.strip_prefix("TR")
        .is_some_and(|digits| digits.len() >= 3 && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn size_of(path: &Path) -> u64 {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return 0;
    };
    if !metadata.is_dir() {
        return metadata.len();
    }
    fs::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| size_of(&entry.path()))
                .sum()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("doc_sources");
        fs::create_dir_all(sources.join("TR001").join("b")).unwrap();
        fs::write(sources.join("TR001").join("a.txt"), b"AAAA").unwrap();
        fs::write(sources.join("TR001").join("b").join("b.txt"), b"BB").unwrap();
        fs::write(sources.join("TR001.gz"), b"archive").unwrap();
        fs::write(sources.join(".TR002.gz.part"), b"half").unwrap();
        fs::create_dir_all(sources.join("notes")).unwrap();
        fs::create_dir_all(temp.path().join("logs")).unwrap();
        fs::write(temp.path().join("logs").join("amadon.log"), b"log line\n").unwrap();
        temp
    }

    #[test]
    fn test_find_targets() {
        let temp = layout();
        let sources = temp.path().join("doc_sources");

        let targets = find_targets(&sources, &temp.path().join("logs"));

        let kinds: Vec<TargetKind> = targets.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TargetKind::Logs, TargetKind::PartialDownload, TargetKind::Extraction]
        );
        assert_eq!(targets[0].path, temp.path().join("logs").join("amadon.log"));
        assert_eq!(targets[0].bytes, 9);
        assert_eq!(targets[2].path, sources.join("TR001"));
        assert_eq!(targets[2].bytes, 6);
    }

    #[test]
    fn test_remove_keeps_archives() {
        let temp = layout();
        let sources = temp.path().join("doc_sources");
        let targets = find_targets(&sources, &temp.path().join("logs"));

        let result = remove_targets(&targets);

        assert_eq!(result.removed, 3);
        assert_eq!(result.bytes_freed, 9 + 4 + 6);
        assert!(result.failures.is_empty());
        assert!(sources.join("TR001.gz").exists());
        assert!(sources.join("notes").exists());
        assert!(!sources.join("TR001").exists());
    }

    #[test]
    fn test_log_dir_holding_data_keeps_data() {
        let temp = TempDir::new().unwrap();
        let data = temp.path();
        let sources = data.join("doc_sources");
        fs::create_dir_all(sources.join("TR001")).unwrap();
        fs::write(sources.join("TR001").join("a.txt"), b"text").unwrap();
        fs::write(sources.join("TR001.gz"), b"archive").unwrap();
        fs::write(data.join("settings.json"), b"{}").unwrap();
        fs::write(data.join("translations.json"), b"[]").unwrap();
        fs::write(data.join("amadon.log"), b"today").unwrap();
        fs::write(data.join("amadon.log.2026-10-16"), b"yesterday").unwrap();
        fs::write(data.join("amadon_errors.log"), b"err").unwrap();

        let targets = find_targets(&sources, data);
        let result = remove_targets(&targets);

        assert_eq!(result.removed, 4);
        assert!(result.failures.is_empty());
        assert!(sources.join("TR001.gz").exists());
        assert!(data.join("settings.json").exists());
        assert!(data.join("translations.json").exists());
        assert!(!data.join("amadon.log").exists());
        assert!(!data.join("amadon.log.2026-10-16").exists());
        assert!(!data.join("amadon_errors.log").exists());
        assert!(!sources.join("TR001").exists());
    }

    #[test]
    fn test_missing_directories() {
        let temp = TempDir::new().unwrap();
        assert!(find_targets(&temp.path().join("none"), &temp.path().join("nolog")).is_empty());
    }

    #[test]
    fn test_archive_stem() {
        assert!(is_archive_stem("TR001"));
        assert!(is_archive_stem("TR1234"));
        assert!(!is_archive_stem("TR01"));
        assert!(!is_archive_stem("TR001.gz"));
    }
}
