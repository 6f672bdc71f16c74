//! Translation catalog loading and caching.
//!
//! The catalog lists the translations available for download. It is read from
//! the first candidate file that parses, normally the copy downloaded at
//! startup followed by the one packaged with the application.
//!
//! Two document shapes are accepted:
//!
//! ```json
//! {"AvailableTranslations": [{"Description": "English 2009", "LanguageID": 1}]}
//! ```
//!
//! ```json
//! [{"descricao": "Portuguese Alternative", "hash": "9e107d9d372bb6826bd81d3542a419d6"}]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::{Map, Value};

use super::error::{TranslationError, TranslationResult};
use super::store::ArchiveId;

/// Key holding the entry list in the object form of the document.
const ENTRIES_KEY: &str = "AvailableTranslations";

/// Recognised spellings of the description field, in lookup order.
const DESCRIPTION_KEYS: [&str; 4] = ["Description", "descricao", "description", "desc"];

/// Recognised spellings of the checksum field.
const CHECKSUM_KEYS: [&str; 2] = ["Hash", "hash"];

/// Explicit language identifier field.
const LANGUAGE_ID_KEY: &str = "LanguageID";

/// A translation advertised by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Position in the loaded (filtered) list.
    pub ordinal: usize,
    /// Explicit language identifier, when the catalog provides one.
    pub language_id: Option<u32>,
    /// Human-readable name, e.g. "English 2009".
    pub description: String,
    /// Expected MD5 of the archive, lowercase hex.
    pub checksum: Option<String>,
}

impl CatalogEntry {
    /// Archive identifier used for file naming.
    ///
    /// The explicit language identifier wins over the ordinal.
    pub fn archive_id(&self) -> ArchiveId {
        let value = self
            .language_id
            .unwrap_or_else(|| u32::try_from(self.ordinal).unwrap_or(u32::MAX));
        ArchiveId::from(value)
    }

    fn from_object(ordinal: usize, object: &Map<String, Value>) -> Option<Self> {
        let description = DESCRIPTION_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))?
            .to_string();

        let language_id = object.get(LANGUAGE_ID_KEY).and_then(|value| match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        let checksum = CHECKSUM_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(|hash| hash.trim().to_ascii_lowercase())
            .filter(|hash| !hash.is_empty());

        Some(Self {
            ordinal,
            language_id,
            description,
            checksum,
        })
    }
}

/// The loaded list of available translations.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    source: PathBuf,
}

impl Catalog {
    /// Parse a catalog document.
    ///
    /// Entries without a description are dropped silently; the ordinal of the
    /// remaining entries is their position after filtering.
    pub fn parse(json: &str, source: impl Into<PathBuf>) -> Result<Self, String> {
        let document: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;

        let raw_entries = match &document {
            Value::Array(items) => items,
            Value::Object(object) => object
                .get(ENTRIES_KEY)
                .and_then(Value::as_array)
                .ok_or_else(|| format!("missing \"{}\" list", ENTRIES_KEY))?,
            _ => return Err("expected a list or an object".to_string()),
        };

        let entries = raw_entries
            .iter()
            .filter_map(Value::as_object)
            .filter(|object| {
                DESCRIPTION_KEYS
                    .iter()
                    .any(|key| object.get(*key).is_some_and(Value::is_string))
            })
            .enumerate()
            .filter_map(|(ordinal, object)| CatalogEntry::from_object(ordinal, object))
            .collect();

        Ok(Self {
            entries,
            source: source.into(),
        })
    }

    /// Build a catalog directly from entries (ordinals are reassigned).
    pub fn from_entries(entries: Vec<CatalogEntry>, source: impl Into<PathBuf>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(ordinal, entry)| CatalogEntry { ordinal, ..entry })
            .collect();
        Self {
            entries,
            source: source.into(),
        }
    }

    /// File the catalog was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at the given ordinal.
    pub fn get(&self, ordinal: usize) -> Option<&CatalogEntry> {
        self.entries.get(ordinal)
    }

    /// First entry whose description matches, ignoring case.
    pub fn find_by_description(&self, description: &str) -> Option<&CatalogEntry> {
        let wanted = description.trim().to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.description.trim().to_lowercase() == wanted)
    }
}

/// Reads the catalog from a prioritised list of candidate files.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    candidates: Vec<PathBuf>,
}

impl CatalogLoader {
    /// Create a loader; candidates are tried in the given order.
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Candidate paths in priority order.
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Load the catalog from the first candidate that parses.
    ///
    /// # Errors
    ///
    /// Returns `CatalogUnavailable` when no candidate exists or none parses.
    pub fn load(&self) -> TranslationResult<Catalog> {
        for path in &self.candidates {
            let contents = match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Catalog candidate not readable");
                    continue;
                }
            };

            match Catalog::parse(&contents, path) {
                Ok(catalog) => {
                    tracing::info!(
                        path = %path.display(),
                        entries = catalog.len(),
                        "Loaded translation catalog"
                    );
                    return Ok(catalog);
                }
                Err(reason) => {
                    tracing::warn!(path = %path.display(), %reason, "Catalog candidate failed to parse");
                }
            }
        }

        Err(TranslationError::CatalogUnavailable {
            tried: self
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Modification times of every candidate, used to detect changes.
    fn stamp(&self) -> Vec<Option<SystemTime>> {
        self.candidates
            .iter()
            .map(|path| path.metadata().and_then(|m| m.modified()).ok())
            .collect()
    }
}

/// Owned catalog cache, invalidated when any candidate file changes.
///
/// Replaces process-wide caching: whoever needs the catalog holds the cache
/// and passes it by reference.
#[derive(Debug)]
pub struct CatalogCache {
    loader: CatalogLoader,
    cached: Option<(Vec<Option<SystemTime>>, Catalog)>,
}

impl CatalogCache {
    /// Create an empty cache over the given loader.
    pub fn new(loader: CatalogLoader) -> Self {
        Self {
            loader,
            cached: None,
        }
    }

    /// The loader backing this cache.
    pub fn loader(&self) -> &CatalogLoader {
        &self.loader
    }

    /// Return the cached catalog, reloading it if candidates changed on disk.
    pub fn get(&mut self) -> TranslationResult<&Catalog> {
        let stamp = self.loader.stamp();
        let fresh = matches!(&self.cached, Some((cached_stamp, _)) if *cached_stamp == stamp);

        if !fresh {
            let catalog = self.loader.load()?;
            self.cached = Some((stamp, catalog));
        }

        match &self.cached {
            Some((_, catalog)) => Ok(catalog),
            None => Err(TranslationError::CatalogUnavailable {
                tried: String::new(),
            }),
        }
    }

    /// Drop the cached catalog.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Whether a catalog is currently cached.
    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }
}
