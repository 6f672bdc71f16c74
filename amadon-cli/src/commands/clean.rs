//! `amadon clean`: remove files that can be regenerated.

use amadon::cleanup::{find_targets, remove_targets, CleanupTarget, TargetKind};
use amadon::config::format_size;
use clap::Args;
use dialoguer::Confirm;

use super::common::Context;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// List what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub fn run(args: CleanArgs) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let targets = find_targets(&ctx.translations.sources_dir, &ctx.config.logging.directory);

    if targets.is_empty() {
        println!("Nothing to clean.");
        return Ok(());
    }

    for target in &targets {
        println!(
            "  {:<16} {:>10}  {}",
            kind_label(target.kind),
            format_size(target.bytes),
            target.path.display()
        );
    }
    println!("Total: {}", format_size(total_bytes(&targets)));

    if args.dry_run {
        return Ok(());
    }

    if !args.yes
        && !Confirm::new()
            .with_prompt("Remove these files?")
            .default(false)
            .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let result = remove_targets(&targets);
    println!(
        "Removed {} item(s), freed {}",
        result.removed,
        format_size(result.bytes_freed)
    );
    for (path, reason) in &result.failures {
        eprintln!("  Could not remove {}: {}", path.display(), reason);
    }

    Ok(())
}

fn kind_label(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Logs => "logs",
        TargetKind::Extraction => "extraction",
        TargetKind::PartialDownload => "partial download",
    }
}

fn total_bytes(targets: &[CleanupTarget]) -> u64 {
    targets.iter().map(|target| target.bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_total_bytes() {
        let target = |bytes| CleanupTarget {
            path: PathBuf::from("x"),
            kind: TargetKind::Extraction,
            bytes,
        };
        assert_eq!(total_bytes(&[target(10), target(32)]), 42);
        assert_eq!(total_bytes(&[]), 0);
    }
}
