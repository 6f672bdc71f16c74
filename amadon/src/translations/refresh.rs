//! Catalog refresh from the remote server.
//!
//! The remote catalog is downloaded into a local cache file at startup. An
//! error marker next to it records the last failed refresh: it is removed
//! before every attempt and written (timestamp plus error) when the attempt
//! fails, so its presence alone tells consumers the cache may be stale.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::catalog::Catalog;
use super::download::{publish_atomically, Fetcher, Transport};
use super::error::{TranslationError, TranslationResult};

/// Cached catalog filename inside the data directory.
pub const CATALOG_CACHE_FILENAME: &str = "translations.json";

/// Error marker filename inside the data directory.
pub const ERROR_MARKER_FILENAME: &str = "translations.error";

/// Outcome of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Where the catalog was written.
    pub path: PathBuf,
    /// Number of usable entries in the downloaded catalog.
    pub entries: usize,
}

/// Downloads the remote catalog into the local cache.
#[derive(Debug)]
pub struct CatalogRefresher<T> {
    fetcher: Fetcher<T>,
    url: String,
    cache_path: PathBuf,
    marker_path: PathBuf,
}

impl<T: Transport> CatalogRefresher<T> {
    /// Create a refresher writing into `data_dir`.
    pub fn new(transport: T, url: impl Into<String>, data_dir: &Path) -> Self {
        Self {
            fetcher: Fetcher::new(transport),
            url: url.into(),
            cache_path: data_dir.join(CATALOG_CACHE_FILENAME),
            marker_path: data_dir.join(ERROR_MARKER_FILENAME),
        }
    }

    /// Path of the cached catalog.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Path of the error marker.
    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Whether the last refresh failed.
    pub fn last_refresh_failed(&self) -> bool {
        self.marker_path.exists()
    }

    /// Download, validate and publish the catalog.
    ///
    /// The previous cache is only replaced by a document that parses as a
    /// catalog. On failure the error marker is written and the error returned.
    pub fn refresh(&self) -> TranslationResult<RefreshOutcome> {
        if self.marker_path.exists() {
            fs::remove_file(&self.marker_path).map_err(|e| TranslationError::WriteFailed {
                path: self.marker_path.clone(),
                source: e,
            })?;
        }

        match self.download() {
            Ok(outcome) => {
                tracing::info!(
                    url = %self.url,
                    path = %outcome.path.display(),
                    entries = outcome.entries,
                    "Catalog refreshed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Catalog refresh failed");
                self.write_marker(&e);
                Err(e)
            }
        }
    }

    /// Refresh at startup, keeping the previous cache when it fails.
    ///
    /// Failures are already logged and recorded in the marker, so callers can
    /// go on with whatever catalog is available.
    pub fn refresh_or_keep(&self) -> Option<RefreshOutcome> {
        self.refresh().ok()
    }

    fn download(&self) -> TranslationResult<RefreshOutcome> {
        let body = self.fetcher.transport().get(&self.url)?;

        let text = String::from_utf8(body).map_err(|_| TranslationError::DownloadFailed {
            url: self.url.clone(),
            reason: "catalog is not UTF-8".to_string(),
        })?;
        let catalog =
            Catalog::parse(&text, &self.cache_path).map_err(|reason| TranslationError::DownloadFailed {
                url: self.url.clone(),
                reason: format!("invalid catalog: {}", reason),
            })?;

        publish_atomically(&self.cache_path, text.as_bytes())?;

        Ok(RefreshOutcome {
            path: self.cache_path.clone(),
            entries: catalog.len(),
        })
    }

    fn write_marker(&self, error: &TranslationError) {
        let contents = format!("{}\n{}\n", Local::now().to_rfc3339(), error);
        if let Err(e) = publish_atomically(&self.marker_path, contents.as_bytes()) {
            tracing::warn!(path = %self.marker_path.display(), error = %e, "Could not write refresh error marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translations::download::test_support::ScriptedTransport;
    use tempfile::TempDir;

    const URL: &str = "https://example.com/translations.json";

    #[test]
    fn test_refresh_writes_cache_and_clears_marker() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(ERROR_MARKER_FILENAME), "old failure").unwrap();
        let transport =
            ScriptedTransport::new().ok(URL, br#"{"AvailableTranslations": [{"Description": "A"}]}"#);
        let refresher = CatalogRefresher::new(transport, URL, temp.path());

        let outcome = refresher.refresh().unwrap();

        assert_eq!(outcome.entries, 1);
        assert!(refresher.cache_path().exists());
        assert!(!refresher.last_refresh_failed());
    }

    #[test]
    fn test_failed_refresh_writes_marker_and_keeps_cache() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join(CATALOG_CACHE_FILENAME);
        fs::write(&cache, r#"[{"Description": "Cached"}]"#).unwrap();
        let refresher = CatalogRefresher::new(ScriptedTransport::new().status(URL, 500), URL, temp.path());

        assert!(refresher.refresh().is_err());

        assert!(refresher.last_refresh_failed());
        let marker = fs::read_to_string(refresher.marker_path()).unwrap();
        assert!(marker.contains("500"));
        assert_eq!(fs::read_to_string(&cache).unwrap(), r#"[{"Description": "Cached"}]"#);
    }

    #[test]
    fn test_unparseable_catalog_is_not_published() {
        let temp = TempDir::new().unwrap();
        let refresher =
            CatalogRefresher::new(ScriptedTransport::new().ok(URL, b"<html>oops</html>"), URL, temp.path());

        assert!(refresher.refresh().is_err());
        assert!(!refresher.cache_path().exists());
        assert!(refresher.last_refresh_failed());
    }

    #[test]
    fn test_startup_refresh_failure_keeps_previous_catalog() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join(CATALOG_CACHE_FILENAME);
        fs::write(&cache, r#"[{"Description": "Cached"}]"#).unwrap();
        let refresher = CatalogRefresher::new(ScriptedTransport::new().status(URL, 503), URL, temp.path());

        assert!(refresher.refresh_or_keep().is_none());

        assert!(refresher.last_refresh_failed());
        let catalog = Catalog::parse(&fs::read_to_string(&cache).unwrap(), &cache).unwrap();
        assert_eq!(catalog.entries()[0].description, "Cached");
    }
}
