//! `amadon extract`: unpack a downloaded archive by identifier.

use std::path::PathBuf;

use amadon::translations::{ArchiveId, PayloadLayout};
use clap::Args;

use super::common::Context;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Archive identifier, e.g. 1 for TR001.gz
    #[arg(allow_negative_numbers = true)]
    pub id: i64,

    /// Replace files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Write the decoded text to TR###.txt instead of unpacking into TR###/
    #[arg(long, conflicts_with = "print")]
    pub text: bool,

    /// Directory for the --text output (defaults to the sources directory)
    #[arg(long, value_name = "DIR", requires = "text")]
    pub out_dir: Option<PathBuf>,

    /// Print the decoded text to stdout
    #[arg(long)]
    pub print: bool,
}

pub fn run(args: ExtractArgs) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let extractor = ctx.translations.extractor();
    let id = ArchiveId::new(args.id)?;

    if args.print {
        print!("{}", extractor.extract_text(id)?);
        return Ok(());
    }

    if args.text {
        let path = extractor.extract_to_file(id, args.out_dir.as_deref(), args.overwrite)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let summary = extractor.extract_archive_with_summary(id, args.overwrite)?;
    let layout = match summary.layout {
        PayloadLayout::SingleStream => "single document",
        PayloadLayout::Tar => "tar archive",
    };
    println!(
        "Extracted {} ({}) into {}",
        id,
        layout,
        summary.target_dir.display()
    );
    println!(
        "  {} file(s) written, {} already present",
        summary.files_written, summary.files_skipped
    );

    Ok(())
}
