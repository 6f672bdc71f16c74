//! Background execution of verification runs.
//!
//! A run executes on one dedicated thread spawned on demand. Progress and the
//! final report travel back over a channel in emission order; the caller owns
//! settings and catalog state and never shares them with the thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use super::error::{TranslationError, TranslationResult};
use super::verify::{VerificationItem, VerificationReport, VerificationWorkflow, WorkflowEvent};

/// Name given to the worker thread.
const WORKER_THREAD_NAME: &str = "amadon-verify";

/// Message sent from the worker to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Progress of the running workflow.
    Progress(WorkflowEvent),
    /// The run finished; always the last message.
    Completed(VerificationReport),
}

/// Launches verification runs, one at a time.
#[derive(Debug, Default)]
pub struct VerificationWorker {
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the run ends, even on panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl VerificationWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a run on a new background thread.
    ///
    /// The returned receiver yields `Progress` messages followed by exactly
    /// one `Completed`. If the workflow panics, the report marks every item
    /// as failed.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` while a previous run has not completed.
    pub fn start(
        &self,
        workflow: VerificationWorkflow,
        items: Vec<VerificationItem>,
    ) -> TranslationResult<Receiver<WorkerMessage>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TranslationError::AlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut workflow = workflow;
                let progress = tx.clone();

                tracing::info!(items = items.len(), "Verification run started");
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    workflow.run(&items, &mut |event: WorkflowEvent| {
                        progress.send(WorkerMessage::Progress(event)).ok();
                    })
                }));

                let report = result.unwrap_or_else(|_| {
                    tracing::error!("Verification run panicked, marking all items failed");
                    VerificationReport::all_failed(&items, "verification worker panicked")
                });
                tracing::info!(
                    success = report.success,
                    failed = report.failed.len(),
                    "Verification run completed"
                );

                // Not running any more once `Completed` is observable.
                drop(guard);
                tx.send(WorkerMessage::Completed(report)).ok();
            })
            .map_err(TranslationError::WorkerSpawnFailed)?;

        Ok(rx)
    }
}

/// Receive messages until completion, passing progress to `on_progress`.
///
/// Returns `None` if the worker vanished without completing.
pub fn wait_for_completion(
    rx: &Receiver<WorkerMessage>,
    mut on_progress: impl FnMut(&WorkflowEvent),
) -> Option<VerificationReport> {
    for message in rx.iter() {
        match message {
            WorkerMessage::Progress(event) => on_progress(&event),
            WorkerMessage::Completed(report) => return Some(report),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translations::download::test_support::ScriptedTransport;
    use crate::translations::download::{RetryPolicy, Transport};
    use crate::translations::extractor::test_support::gzip;
    use crate::translations::extractor::ArchiveExtractor;
    use crate::translations::slots::Slot;
    use crate::translations::store::{ArchiveId, ArchiveStore};
    use crate::translations::verify::{ItemStatus, WorkflowState};
    use std::fs;
    use tempfile::TempDir;

    fn item(id: u32) -> VerificationItem {
        VerificationItem {
            slot: Slot::First,
            archive: ArchiveId::from(id),
            description: "English 2009".to_string(),
            checksum: None,
        }
    }

    #[test]
    fn test_messages_end_with_completion() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("TR001.gz"), gzip(b"text")).unwrap();
        let workflow = VerificationWorkflow::new(ArchiveExtractor::new(ArchiveStore::new(temp.path())));
        let worker = VerificationWorker::new();

        let rx = worker.start(workflow, vec![item(1)]).unwrap();
        let messages: Vec<WorkerMessage> = rx.iter().collect();

        assert_eq!(
            messages.first(),
            Some(&WorkerMessage::Progress(WorkflowEvent::StateChanged(
                WorkflowState::Checking
            )))
        );
        match messages.last() {
            Some(WorkerMessage::Completed(report)) => {
                assert!(report.success);
                assert_eq!(report.outcomes[0].status, ItemStatus::Extracted);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(
            messages
                .iter()
                .filter(|m| matches!(m, WorkerMessage::Completed(_)))
                .count(),
            1
        );
        assert!(!worker.is_running());
    }

    /// Transport whose requests always panic.
    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn get(&self, url: &str) -> TranslationResult<Vec<u8>> {
            panic!("connection handler crashed for {}", url);
        }
    }

    #[test]
    fn test_panic_marks_every_item_failed() {
        let temp = TempDir::new().unwrap();
        let extractor = ArchiveExtractor::new(ArchiveStore::new(temp.path()));
        let workflow = VerificationWorkflow::new(extractor)
            .with_remote(Arc::new(PanickingTransport), "https://example.com")
            .with_retry_policy(RetryPolicy::immediate(3));
        let worker = VerificationWorker::new();
        let mut second = item(2);
        second.slot = Slot::Second;

        let rx = worker.start(workflow, vec![item(1), second]).unwrap();
        let messages: Vec<WorkerMessage> = rx.iter().collect();

        let reports: Vec<&VerificationReport> = messages
            .iter()
            .filter_map(|m| match m {
                WorkerMessage::Completed(report) => Some(report),
                WorkerMessage::Progress(_) => None,
            })
            .collect();
        assert_eq!(reports.len(), 1);
        let report = reports[0];
        assert!(!report.success);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report
            .outcomes
            .iter()
            .all(|outcome| matches!(outcome.status, ItemStatus::Failed(_))));
        assert_eq!(report.failed, vec![ArchiveId::from(1), ArchiveId::from(2)]);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_second_start_is_rejected_while_running() {
        let temp = TempDir::new().unwrap();
        let extractor = ArchiveExtractor::new(ArchiveStore::new(temp.path()));
        let workflow = VerificationWorkflow::new(extractor)
            .with_remote(Arc::new(ScriptedTransport::new()), "https://example.com")
            .with_retry_policy(RetryPolicy::new(2, std::time::Duration::from_millis(300)));
        let worker = VerificationWorker::new();

        let rx = worker.start(workflow.clone(), vec![item(1)]).unwrap();

        assert!(matches!(
            worker.start(workflow.clone(), vec![item(1)]),
            Err(TranslationError::AlreadyRunning)
        ));

        let report = wait_for_completion(&rx, |_| {}).unwrap();
        assert_eq!(report.failed, vec![ArchiveId::from(1)]);
        assert!(!worker.is_running());
        assert!(worker.start(workflow, Vec::new()).is_ok());
    }
}
