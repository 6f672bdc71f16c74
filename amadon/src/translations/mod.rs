//! Translation package acquisition and verification.
//!
//! Translations are distributed as gzip archives (`TR###.gz`) listed in a JSON
//! catalog. The user keeps up to three of them in slots; a verification run
//! makes sure each selected archive is present, intact and extracted.
//!
//! # Architecture
//!
//! ```text
//! VerificationWorker (background thread, mpsc messages)
//!         │
//!         ▼
//! VerificationWorkflow ── SlotAssignment + Catalog → VerificationItem
//!         │
//!         ├── Fetcher (download + checksum + atomic publish, retries)
//!         │
//!         └── ArchiveExtractor ── ArchiveStore (paths, MD5)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use amadon::translations::{
//!     Settings, SlotAssignment, TranslationsConfig, VerificationItem, VerificationWorker,
//!     wait_for_completion,
//! };
//!
//! let config = TranslationsConfig::new("doc_sources", ".");
//! let settings = Settings::load_or_default(&config.settings_path());
//! let mut catalogs = config.catalog_cache(settings.catalog_path.as_deref());
//! let catalog = catalogs.get()?;
//! let slots = SlotAssignment::resolve(settings.persisted_slots(), catalog)?;
//!
//! let worker = VerificationWorker::new();
//! let rx = worker.start(config.workflow()?, VerificationItem::from_slots(&slots, catalog))?;
//! let report = wait_for_completion(&rx, |event| println!("{:?}", event));
//! ```

mod catalog;
mod checksum;
mod config;
mod download;
mod error;
mod extractor;
mod refresh;
mod settings;
mod slots;
mod store;
mod verify;
mod worker;

pub use catalog::{Catalog, CatalogCache, CatalogEntry, CatalogLoader};
pub use checksum::{calculate_bytes_checksum, calculate_file_checksum, checksums_match};
pub use config::TranslationsConfig;
pub use download::{
    partial_path, publish_atomically, FailureKind, FetchEvent, Fetcher, HttpTransport,
    RetryPolicy, Transport, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS,
};
pub use error::{TranslationError, TranslationResult};
pub use extractor::{unpack, ArchiveExtractor, ExtractionSummary, PayloadLayout};
pub use refresh::{CatalogRefresher, RefreshOutcome, CATALOG_CACHE_FILENAME, ERROR_MARKER_FILENAME};
pub use settings::{Settings, SETTINGS_FILENAME};
pub use slots::{
    reconcile, Slot, SlotAssignment, SlotChange, SlotValue, DEFAULT_PRIMARY, DEFAULT_SECONDARY,
    NONE_VALUE,
};
pub use store::{ArchiveId, ArchiveStore};
pub use verify::{
    verify_user_translations_choice, ItemOutcome, ItemStatus, VerificationItem,
    VerificationReport, VerificationWorkflow, WorkflowEvent, WorkflowState,
};
pub use worker::{wait_for_completion, VerificationWorker, WorkerMessage};
