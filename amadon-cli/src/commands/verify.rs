//! `amadon verify`: make the selected translations usable.

use std::collections::BTreeMap;
use std::time::Duration;

use amadon::translations::{
    verify_user_translations_choice, wait_for_completion, ArchiveId, FetchEvent, ItemStatus,
    VerificationItem, VerificationReport, VerificationWorker, VerificationWorkflow, WorkflowEvent,
    WorkflowState,
};
use clap::Args;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use super::common::Context;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Check these archive identifiers locally instead of the selected slots
    #[arg(long = "id", value_name = "ID", num_args = 1.., allow_negative_numbers = true)]
    pub ids: Vec<i64>,

    /// Only report the local state of --id archives, never extract
    #[arg(long, requires = "ids")]
    pub no_extract: bool,

    /// Do not offer to retry failed downloads
    #[arg(long)]
    pub no_retry: bool,
}

pub fn run(args: VerifyArgs) -> Result<(), CliError> {
    let mut ctx = Context::load()?;

    if !args.ids.is_empty() {
        return run_local(&ctx, &args.ids, !args.no_extract);
    }

    refresh_catalog(&ctx)?;
    let catalog = ctx.catalog()?;
    let slots = ctx.slots(&catalog)?;
    // First runs persist the default slots.
    ctx.save_slots(&slots)?;

    let mut items = VerificationItem::from_slots(&slots, &catalog);
    if items.is_empty() {
        println!("No translations selected.");
        return Ok(());
    }

    let workflow = ctx.translations.workflow()?;
    let worker = VerificationWorker::new();

    loop {
        let report = run_worker(&worker, workflow.clone(), items.clone())?;
        print_report(&report);

        if report.success {
            return Ok(());
        }

        let retry = !args.no_retry
            && console::user_attended()
            && Confirm::new()
                .with_prompt("Some translations failed. Retry them?")
                .default(true)
                .interact()?;
        if !retry {
            return Err(CliError::VerificationFailed(report.failed));
        }

        items.retain(|item| report.failed.contains(&item.archive));
    }
}

/// Fetch the remote catalog once, when configured. A failed refresh keeps
/// the previous catalog.
fn refresh_catalog(ctx: &Context) -> Result<(), CliError> {
    let Some(refresher) = ctx.translations.refresher()? else {
        return Ok(());
    };
    if refresher.refresh_or_keep().is_none() {
        println!(
            "{}",
            style("Warning: could not refresh the catalog; using the previous one.").yellow()
        );
    }
    Ok(())
}

/// Run one workflow on the background worker, showing a spinner meanwhile.
fn run_worker(
    worker: &VerificationWorker,
    workflow: VerificationWorkflow,
    items: Vec<VerificationItem>,
) -> Result<VerificationReport, CliError> {
    let rx = worker.start(workflow, items)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Checking translations...");

    let report = wait_for_completion(&rx, |event| {
        if let Some(message) = describe(event) {
            spinner.set_message(message);
        }
    });
    spinner.finish_and_clear();

    report.ok_or(CliError::WorkerLost)
}

/// Spinner text for a progress event.
fn describe(event: &WorkflowEvent) -> Option<String> {
    match event {
        WorkflowEvent::StateChanged(WorkflowState::Downloading) => {
            Some("Downloading translations...".to_string())
        }
        WorkflowEvent::StateChanged(_) => None,
        WorkflowEvent::ItemStarted { slot, archive } => {
            Some(format!("Checking {} ({})", archive, slot))
        }
        WorkflowEvent::Fetch { archive, event } => match event {
            FetchEvent::Attempt {
                attempt,
                max_attempts,
                ..
            } => Some(format!(
                "Downloading {} (attempt {}/{})",
                archive, attempt, max_attempts
            )),
            FetchEvent::Backoff { delay } => Some(format!(
                "Download of {} failed, retrying in {}s",
                archive,
                delay.as_secs()
            )),
            _ => None,
        },
        WorkflowEvent::ItemFinished { archive, status } => {
            Some(format!("{}: {}", archive, status))
        }
    }
}

fn print_report(report: &VerificationReport) {
    for outcome in &report.outcomes {
        println!(
            "  {} {:<6} {:<24} {}",
            outcome.item.slot,
            outcome.item.archive,
            outcome.item.description,
            styled(&outcome.status)
        );
    }
    println!();
    if report.success {
        println!("{}", style("All translations ready.").green());
    } else {
        println!(
            "{}",
            style(format!("{} translation(s) failed.", report.failed.len())).red()
        );
    }
}

fn styled(status: &ItemStatus) -> console::StyledObject<String> {
    let text = status.to_string();
    match status {
        ItemStatus::Ok | ItemStatus::Extracted => style(text).green(),
        ItemStatus::Exists | ItemStatus::Pending => style(text).yellow(),
        ItemStatus::MissingArchive | ItemStatus::Failed(_) => style(text).red(),
    }
}

/// Check archives by identifier, without touching the network.
///
/// Missing archives are only reported; errors make the command fail.
fn run_local(ctx: &Context, ids: &[i64], auto_extract: bool) -> Result<(), CliError> {
    let extractor = ctx.translations.extractor();
    let results = verify_user_translations_choice(&extractor, ids, auto_extract);

    for (raw, status) in &results {
        let label = ArchiveId::new(*raw)
            .map(|id| id.to_string())
            .unwrap_or_else(|_| raw.to_string());
        println!("  {:<6} {}", label, styled(status));
    }

    if results.values().any(is_local_error) {
        return Err(CliError::VerificationFailed(failed_archives(&results)));
    }
    Ok(())
}

fn is_local_error(status: &ItemStatus) -> bool {
    matches!(status, ItemStatus::Failed(_))
}

fn failed_archives(results: &BTreeMap<i64, ItemStatus>) -> Vec<ArchiveId> {
    results
        .iter()
        .filter(|(_, status)| is_local_error(status))
        .filter_map(|(raw, _)| ArchiveId::new(*raw).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use amadon::translations::{Slot, TranslationsConfig};

    #[test]
    fn test_describe_attempt() {
        let event = WorkflowEvent::Fetch {
            archive: ArchiveId::from(3),
            event: FetchEvent::Attempt {
                attempt: 2,
                max_attempts: 3,
                url: "https://example.org/TR003.gz".to_string(),
            },
        };
        assert_eq!(
            describe(&event).as_deref(),
            Some("Downloading TR003 (attempt 2/3)")
        );
    }

    #[test]
    fn test_describe_item_started() {
        let event = WorkflowEvent::ItemStarted {
            slot: Slot::Second,
            archive: ArchiveId::from(12),
        };
        assert_eq!(describe(&event).as_deref(), Some("Checking TR012 (slot2)"));
        assert!(describe(&WorkflowEvent::StateChanged(WorkflowState::Checking)).is_none());
    }

    #[test]
    fn test_failed_archives_skips_invalid_ids() {
        let mut results = BTreeMap::new();
        results.insert(-4, ItemStatus::Failed("invalid".to_string()));
        results.insert(1, ItemStatus::Ok);
        results.insert(5, ItemStatus::Failed("corrupt".to_string()));

        assert_eq!(failed_archives(&results), vec![ArchiveId::from(5)]);
    }

    #[test]
    fn test_missing_archive_is_not_a_local_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = test_context(temp.path());

        assert!(run_local(&ctx, &[7], true).is_ok());
        assert!(!is_local_error(&ItemStatus::MissingArchive));
        assert!(is_local_error(&ItemStatus::Failed("bad gzip".to_string())));
    }

    #[test]
    fn test_corrupt_archive_fails_local_check() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        std::fs::create_dir_all(temp.path().join("doc_sources")).unwrap();
        std::fs::write(temp.path().join("doc_sources").join("TR007.gz"), b"not gzip").unwrap();

        match run_local(&ctx, &[7], true) {
            Err(CliError::VerificationFailed(ids)) => assert_eq!(ids, vec![ArchiveId::from(7)]),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    fn test_context(root: &std::path::Path) -> Context {
        let translations = TranslationsConfig::new(root.join("doc_sources"), root.join("data"));
        Context {
            config: amadon::config::ConfigFile::default(),
            translations,
            settings: amadon::translations::Settings::default(),
        }
    }
}
