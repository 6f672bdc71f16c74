//! Runtime configuration for the translation subsystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::catalog::{CatalogCache, CatalogLoader};
use super::download::{HttpTransport, RetryPolicy, DEFAULT_TIMEOUT_SECS};
use super::error::TranslationResult;
use super::extractor::ArchiveExtractor;
use super::refresh::{CatalogRefresher, CATALOG_CACHE_FILENAME};
use super::settings::SETTINGS_FILENAME;
use super::store::ArchiveStore;
use super::verify::VerificationWorkflow;

/// Configuration for archives, catalog and downloads.
#[derive(Debug, Clone)]
pub struct TranslationsConfig {
    /// Directory holding `TR###.gz` archives and their extraction folders.
    pub sources_dir: PathBuf,

    /// Directory for the downloaded catalog, error marker and settings.
    pub data_dir: PathBuf,

    /// Catalog shipped with the application, used when no download exists.
    pub packaged_catalog: Option<PathBuf>,

    /// Base URL serving `TR###.gz`. Without it, missing archives are only
    /// reported.
    pub archive_base_url: Option<String>,

    /// URL of the full catalog document.
    pub catalog_url: Option<String>,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Retry policy for archive downloads.
    pub retry: RetryPolicy,
}

impl Default for TranslationsConfig {
    fn default() -> Self {
        Self {
            sources_dir: PathBuf::from("doc_sources"),
            data_dir: PathBuf::from("."),
            packaged_catalog: None,
            archive_base_url: None,
            catalog_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl TranslationsConfig {
    /// Create a configuration for the given directories.
    pub fn new(sources_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources_dir: sources_dir.into(),
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the packaged fallback catalog.
    pub fn with_packaged_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.packaged_catalog = Some(path.into());
        self
    }

    /// Set the archive base URL.
    pub fn with_archive_base_url(mut self, url: impl Into<String>) -> Self {
        self.archive_base_url = Some(url.into());
        self
    }

    /// Set the catalog URL.
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = Some(url.into());
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Path of the persisted settings document.
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILENAME)
    }

    /// Path of the downloaded catalog.
    pub fn catalog_cache_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_CACHE_FILENAME)
    }

    /// Catalog candidates in priority order.
    ///
    /// A catalog chosen by the user comes first, then the downloaded copy,
    /// then the packaged one.
    pub fn catalog_candidates(&self, user_catalog: Option<&Path>) -> Vec<PathBuf> {
        user_catalog
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(self.catalog_cache_path()))
            .chain(self.packaged_catalog.clone())
            .collect()
    }

    /// Catalog cache over [`catalog_candidates`](Self::catalog_candidates).
    pub fn catalog_cache(&self, user_catalog: Option<&Path>) -> CatalogCache {
        CatalogCache::new(CatalogLoader::new(self.catalog_candidates(user_catalog)))
    }

    /// Archive store rooted at the sources directory.
    pub fn store(&self) -> ArchiveStore {
        ArchiveStore::new(&self.sources_dir)
    }

    /// Extractor over [`store`](Self::store).
    pub fn extractor(&self) -> ArchiveExtractor {
        ArchiveExtractor::new(self.store())
    }

    /// HTTP transport honouring the configured timeout.
    pub fn http_transport(&self) -> TranslationResult<HttpTransport> {
        HttpTransport::with_timeout(self.timeout)
    }

    /// Verification workflow, downloading from the archive base URL when set.
    pub fn workflow(&self) -> TranslationResult<VerificationWorkflow> {
        let workflow = VerificationWorkflow::new(self.extractor()).with_retry_policy(self.retry);
        match &self.archive_base_url {
            Some(url) => Ok(workflow.with_remote(Arc::new(self.http_transport()?), url.clone())),
            None => Ok(workflow),
        }
    }

    /// Catalog refresher, when a catalog URL is configured.
    pub fn refresher(&self) -> TranslationResult<Option<CatalogRefresher<HttpTransport>>> {
        match &self.catalog_url {
            Some(url) => Ok(Some(CatalogRefresher::new(
                self.http_transport()?,
                url.clone(),
                &self.data_dir,
            ))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranslationsConfig::default();
        assert_eq!(config.sources_dir, PathBuf::from("doc_sources"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.archive_base_url.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TranslationsConfig::new("/srv/doc_sources", "/srv/data")
            .with_packaged_catalog("/usr/share/amadon/translations.json")
            .with_archive_base_url("https://example.com/archives")
            .with_catalog_url("https://example.com/translations.json")
            .with_timeout(Duration::from_secs(10))
            .with_retry_policy(RetryPolicy::immediate(5));

        assert_eq!(config.settings_path(), PathBuf::from("/srv/data/settings.json"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 5);
        assert!(config.workflow().is_ok());
        assert!(config.refresher().unwrap().is_some());
    }

    #[test]
    fn test_catalog_candidate_order() {
        let config = TranslationsConfig::new("/srv/doc_sources", "/srv/data")
            .with_packaged_catalog("/usr/share/amadon/translations.json");

        let candidates = config.catalog_candidates(Some(Path::new("/home/me/custom.json")));

        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/home/me/custom.json"),
                PathBuf::from("/srv/data/translations.json"),
                PathBuf::from("/usr/share/amadon/translations.json"),
            ]
        );
        assert_eq!(config.catalog_candidates(None).len(), 2);
    }
}
