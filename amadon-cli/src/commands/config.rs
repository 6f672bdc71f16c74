//! `amadon config`: read and write `config.ini` from the command line.

use amadon::config::{config_file_path, ConfigFile, ConfigKey};
use clap::Subcommand;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// Key as section.key, e.g. translations.catalog_url
        key: String,
    },

    /// Change one value; an empty value clears optional keys
    Set {
        /// Key as section.key, e.g. translations.catalog_url
        key: String,

        value: String,
    },

    /// Print every key with its current value
    List,

    /// Print the location of the configuration file
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let config = ConfigFile::load()?;
            println!("{}", display_value(&key.get(&config)));
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load()?;
            key.set(&mut config, &value)?;
            config.save()?;
            tracing::info!(key = %key, value = %value, "Configuration updated");
            println!("{} = {}", key, display_value(&key.get(&config)));
            Ok(())
        }
        ConfigCommands::List => {
            let config = ConfigFile::load()?;
            let mut section = "";
            for key in ConfigKey::all() {
                if key.section() != section {
                    if !section.is_empty() {
                        println!();
                    }
                    section = key.section();
                    println!("[{}]", section);
                }
                println!("  {} = {}", key.key_name(), display_value(&key.get(&config)));
            }
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown key '{}'. Run 'amadon config list' for the available keys.",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
