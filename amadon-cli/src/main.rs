//! Amadon CLI - manage translation packages from the command line.
//!
//! Wraps the `amadon` library: verifies and downloads the archives behind the
//! three translation slots, manages slot selection, refreshes the catalog and
//! cleans up regenerable files.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use amadon::config::{ConfigFile, CONFIG_PATH_ENV};
use amadon::logging::{self, LoggingConfig};
use clap::{Parser, Subcommand};

use commands::{catalog, clean, config, extract, slots, verify};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "amadon", version, about = "Manage Amadon translation packages")]
struct Cli {
    /// Use this configuration file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also print log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify, download and extract the translations in the selected slots
    Verify(verify::VerifyArgs),

    /// Show or change the translation slots
    #[command(subcommand)]
    Slots(slots::SlotsCommands),

    /// Inspect or refresh the translation catalog
    #[command(subcommand)]
    Catalog(catalog::CatalogCommands),

    /// Extract a downloaded archive
    Extract(extract::ExtractArgs),

    /// Remove logs, extraction folders and partial downloads
    Clean(clean::CleanArgs),

    /// View or modify configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        std::env::set_var(CONFIG_PATH_ENV, path);
    }

    let file = ConfigFile::load().unwrap_or_default();
    let guard = match logging::init(&LoggingConfig::from(&file).with_console(cli.verbose)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", CliError::from(e));
            None
        }
    };

    tracing::debug!(command = ?cli.command, "Starting");
    let code = match run(cli.command) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            1
        }
    };

    // Flush the log writers before exiting.
    drop(guard);
    process::exit(code);
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Verify(args) => verify::run(args),
        Commands::Slots(command) => slots::run(command),
        Commands::Catalog(command) => catalog::run(command),
        Commands::Extract(args) => extract::run(args),
        Commands::Clean(args) => clean::run(args),
        Commands::Config(command) => config::run(command),
    }
}
