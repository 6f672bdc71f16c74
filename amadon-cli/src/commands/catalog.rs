//! Catalog commands.

use amadon::translations::{ArchiveStore, CatalogEntry, ERROR_MARKER_FILENAME};
use clap::Subcommand;
use console::style;

use super::common::Context;
use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// List available translations and their local state
    List,

    /// Download the latest catalog from the configured URL
    Refresh,
}

pub fn run(command: CatalogCommands) -> Result<(), CliError> {
    let ctx = Context::load()?;

    match command {
        CatalogCommands::List => run_list(&ctx),
        CatalogCommands::Refresh => run_refresh(&ctx),
    }
}

fn run_list(ctx: &Context) -> Result<(), CliError> {
    let marker = ctx.translations.data_dir.join(ERROR_MARKER_FILENAME);
    if marker.exists() {
        println!(
            "{}",
            style("Warning: the last catalog refresh failed; showing the previous catalog.")
                .yellow()
        );
    }

    let catalog = ctx.catalog()?;
    let store = ctx.translations.store();

    println!("Catalog: {}", catalog.source().display());
    println!();
    for entry in catalog.entries() {
        println!(
            "  {:>3}  {:<6} {:<32} {}",
            entry.ordinal,
            entry.archive_id(),
            entry.description,
            local_state(&store, entry)
        );
    }
    println!();
    println!("{} translation(s)", catalog.len());

    Ok(())
}

fn local_state(store: &ArchiveStore, entry: &CatalogEntry) -> &'static str {
    let id = entry.archive_id();
    match (store.has_archive(id), store.is_extracted(id)) {
        (_, true) => "installed",
        (true, false) => "downloaded",
        (false, false) => "-",
    }
}

fn run_refresh(ctx: &Context) -> Result<(), CliError> {
    let refresher = ctx.refresher()?;
    println!("Refreshing catalog...");

    let outcome = refresher.refresh()?;
    println!(
        "Saved {} translation(s) to {}",
        outcome.entries,
        outcome.path.display()
    );

    Ok(())
}
