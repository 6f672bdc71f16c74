//! Verification of the translations selected in the slots.
//!
//! A run walks the selected slots in order. For each one it checks the local
//! archive against the catalog checksum, downloads it when absent or stale,
//! and makes sure it is extracted. Failures are recorded per item and never
//! stop the run.
//!
//! ```text
//! Idle ──► Checking ⇄ Downloading ──► Completed { success }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::catalog::Catalog;
use super::download::{FetchEvent, Fetcher, RetryPolicy, Transport};
use super::error::{TranslationError, TranslationResult};
use super::extractor::ArchiveExtractor;
use super::slots::{Slot, SlotAssignment};
use super::store::ArchiveId;

/// Workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Checking,
    Downloading,
    Completed { success: bool },
}

/// Per-item status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Archive present and already extracted.
    Ok,
    /// Archive extracted during this run.
    Extracted,
    /// Archive absent and nothing could fetch it.
    MissingArchive,
    /// Extraction folder exists but is empty (extraction not requested).
    Exists,
    /// No extraction folder yet (extraction not requested).
    Pending,
    /// Processing failed.
    Failed(String),
}

impl ItemStatus {
    /// Whether the item counts as failed in a workflow report.
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemStatus::MissingArchive | ItemStatus::Failed(_))
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Ok => f.write_str("ok"),
            ItemStatus::Extracted => f.write_str("extracted"),
            ItemStatus::MissingArchive => f.write_str("missing-archive"),
            ItemStatus::Exists => f.write_str("exists"),
            ItemStatus::Pending => f.write_str("pending"),
            ItemStatus::Failed(reason) => write!(f, "error:{}", reason),
        }
    }
}

/// A selected translation to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationItem {
    pub slot: Slot,
    pub archive: ArchiveId,
    pub description: String,
    pub checksum: Option<String>,
}

impl VerificationItem {
    /// Items for the non-empty slots, in slot order.
    ///
    /// Slots whose ordinal is not in the catalog are skipped, as are slots
    /// whose entry resolves to an archive an earlier slot already uses.
    pub fn from_slots(slots: &SlotAssignment, catalog: &Catalog) -> Vec<Self> {
        let mut seen = BTreeSet::new();
        slots
            .selected()
            .into_iter()
            .filter_map(|(slot, ordinal)| {
                let Some(entry) = catalog.get(ordinal) else {
                    tracing::warn!(%slot, ordinal, "Slot points outside the catalog, skipping");
                    return None;
                };
                let archive = entry.archive_id();
                if !seen.insert(archive) {
                    tracing::warn!(
                        %slot,
                        ordinal,
                        %archive,
                        "Slot resolves to an archive already used by another slot, skipping"
                    );
                    return None;
                }
                Some(Self {
                    slot,
                    archive,
                    description: entry.description.clone(),
                    checksum: entry.checksum.clone(),
                })
            })
            .collect()
    }
}

/// Result of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item: VerificationItem,
    pub status: ItemStatus,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub outcomes: Vec<ItemOutcome>,
    /// True only when no item failed.
    pub success: bool,
    /// Archives whose item failed, in processing order.
    pub failed: Vec<ArchiveId>,
}

impl VerificationReport {
    /// Build a report from per-item outcomes.
    pub fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let failed: Vec<ArchiveId> = outcomes
            .iter()
            .filter(|outcome| outcome.status.is_failure())
            .map(|outcome| outcome.item.archive)
            .collect();
        Self {
            success: failed.is_empty(),
            failed,
            outcomes,
        }
    }

    /// Report in which every item failed with the same reason.
    pub fn all_failed(items: &[VerificationItem], reason: &str) -> Self {
        Self::from_outcomes(
            items
                .iter()
                .map(|item| ItemOutcome {
                    item: item.clone(),
                    status: ItemStatus::Failed(reason.to_string()),
                })
                .collect(),
        )
    }
}

/// Progress emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StateChanged(WorkflowState),
    ItemStarted { slot: Slot, archive: ArchiveId },
    Fetch { archive: ArchiveId, event: FetchEvent },
    ItemFinished { archive: ArchiveId, status: ItemStatus },
}

/// Verification state machine.
///
/// Without a remote source, absent archives are reported as
/// `missing-archive` instead of being downloaded.
#[derive(Clone)]
pub struct VerificationWorkflow {
    extractor: ArchiveExtractor,
    fetcher: Option<Fetcher<Arc<dyn Transport>>>,
    archive_base_url: String,
    policy: RetryPolicy,
    state: WorkflowState,
}

impl fmt::Debug for VerificationWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationWorkflow")
            .field("sources_dir", &self.extractor.store().sources_dir())
            .field("remote", &self.fetcher.is_some())
            .field("archive_base_url", &self.archive_base_url)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish()
    }
}

impl VerificationWorkflow {
    /// Create a local-only workflow.
    pub fn new(extractor: ArchiveExtractor) -> Self {
        Self {
            extractor,
            fetcher: None,
            archive_base_url: String::new(),
            policy: RetryPolicy::default(),
            state: WorkflowState::Idle,
        }
    }

    /// Download missing archives from `<base_url>/TR###.gz`.
    pub fn with_remote(mut self, transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        self.fetcher = Some(Fetcher::new(transport));
        self.archive_base_url = base_url.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// The extractor used for local checks.
    pub fn extractor(&self) -> &ArchiveExtractor {
        &self.extractor
    }

    /// Remote URL of an archive.
    pub fn archive_url(&self, id: ArchiveId) -> String {
        format!(
            "{}/{}",
            self.archive_base_url.trim_end_matches('/'),
            id.archive_filename()
        )
    }

    /// Process every item and report.
    ///
    /// Calling this again after completion starts a fresh run.
    pub fn run(
        &mut self,
        items: &[VerificationItem],
        on_event: &mut dyn FnMut(WorkflowEvent),
    ) -> VerificationReport {
        self.transition(WorkflowState::Checking, on_event);

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            if self.state != WorkflowState::Checking {
                self.transition(WorkflowState::Checking, on_event);
            }
            on_event(WorkflowEvent::ItemStarted {
                slot: item.slot,
                archive: item.archive,
            });

            let status = match self.process(item, on_event) {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(
                        archive = %item.archive,
                        slot = %item.slot,
                        error = %e,
                        "Translation verification failed"
                    );
                    ItemStatus::Failed(e.to_string())
                }
            };

            tracing::info!(archive = %item.archive, %status, "Translation verified");
            on_event(WorkflowEvent::ItemFinished {
                archive: item.archive,
                status: status.clone(),
            });
            outcomes.push(ItemOutcome {
                item: item.clone(),
                status,
            });
        }

        let report = VerificationReport::from_outcomes(outcomes);
        self.transition(
            WorkflowState::Completed {
                success: report.success,
            },
            on_event,
        );
        report
    }

    fn transition(&mut self, state: WorkflowState, on_event: &mut dyn FnMut(WorkflowEvent)) {
        tracing::debug!(from = ?self.state, to = ?state, "Verification state change");
        self.state = state;
        on_event(WorkflowEvent::StateChanged(state));
    }

    fn process(
        &mut self,
        item: &VerificationItem,
        on_event: &mut dyn FnMut(WorkflowEvent),
    ) -> TranslationResult<ItemStatus> {
        let store = self.extractor.store();
        let expected = item.checksum.as_deref();

        let fetched = if store.matches_checksum(item.archive, expected)? {
            false
        } else if self.fetcher.is_some() {
            self.transition(WorkflowState::Downloading, on_event);
            self.download(item, on_event)?;
            true
        } else if !store.has_archive(item.archive) {
            return Ok(ItemStatus::MissingArchive);
        } else {
            let path = store.archive_path(item.archive);
            return Err(TranslationError::ChecksumMismatch {
                filename: item.archive.archive_filename(),
                expected: expected.unwrap_or_default().to_string(),
                actual: store.checksum_of(&path)?,
            });
        };

        if !fetched && self.extractor.store().is_extracted(item.archive) {
            return Ok(ItemStatus::Ok);
        }

        // A fresh download replaces whatever an older archive left behind.
        self.extractor.extract_archive(item.archive, fetched)?;
        Ok(ItemStatus::Extracted)
    }

    fn download(
        &self,
        item: &VerificationItem,
        on_event: &mut dyn FnMut(WorkflowEvent),
    ) -> TranslationResult<u64> {
        let Some(fetcher) = &self.fetcher else {
            return Err(TranslationError::InvalidConfig(
                "no remote source configured".to_string(),
            ));
        };

        let archive = item.archive;
        let url = self.archive_url(archive);
        let dest = self.extractor.store().archive_path(archive);

        fetcher.fetch_with_retry(
            &url,
            &dest,
            item.checksum.as_deref(),
            &self.policy,
            &mut |event: FetchEvent| on_event(WorkflowEvent::Fetch { archive, event }),
        )
    }
}

/// Check chosen archives locally, optionally extracting them.
///
/// Returns one status per identifier:
/// - `missing-archive`: no `TR###.gz`
/// - `ok`: extraction folder present with content
/// - `extracted`: extracted during this call (`auto_extract`)
/// - `exists` / `pending`: folder empty / absent (without `auto_extract`)
///
/// Failures are reported as `error:<reason>` for that identifier only.
pub fn verify_user_translations_choice(
    extractor: &ArchiveExtractor,
    chosen: &[i64],
    auto_extract: bool,
) -> BTreeMap<i64, ItemStatus> {
    chosen
        .iter()
        .map(|&raw| {
            let status = check_local(extractor, raw, auto_extract).unwrap_or_else(|e| {
                tracing::warn!(archive = raw, error = %e, "Local translation check failed");
                ItemStatus::Failed(e.to_string())
            });
            (raw, status)
        })
        .collect()
}

fn check_local(
    extractor: &ArchiveExtractor,
    raw: i64,
    auto_extract: bool,
) -> TranslationResult<ItemStatus> {
    let id = ArchiveId::new(raw)?;
    let store = extractor.store();

    if !store.has_archive(id) {
        return Ok(ItemStatus::MissingArchive);
    }
    if store.is_extracted(id) {
        return Ok(ItemStatus::Ok);
    }
    if auto_extract {
        extractor.extract_archive(id, false)?;
        return Ok(ItemStatus::Extracted);
    }

    Ok(if store.extraction_dir(id).exists() {
        ItemStatus::Exists
    } else {
        ItemStatus::Pending
    })
}
