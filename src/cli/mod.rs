//! CLI module for kitchenhub.
//!
//! This module provides the command-line interface:
//! - Argument parsing
//! - Version display
//! - Command handlers (`watch`, `retry`, `tailor`, `history`)
//!
//! # Usage
//!
//! ```ignore
//! use kitchenhub::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command, config).await?;
//! ```

pub mod args;
pub mod commands;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use commands::Hub;
pub use version::{version_line, VERSION};

use color_eyre::eyre::{eyre, Result};

use crate::config::ClientConfig;
use crate::models::TailorKey;

/// Run a parsed CLI command against the hub described by `config`.
pub async fn run_cli_command(command: CliCommand, config: ClientConfig) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Invalid(reason) => {
            eprintln!("{}", USAGE);
            Err(eyre!(reason))
        }
        CliCommand::Watch { appliance_id } => Hub::new(config)?.watch(&appliance_id).await,
        CliCommand::Retry { appliance_id } => Hub::new(config)?.retry(&appliance_id).await,
        CliCommand::Tailor {
            recipe_id,
            appliance_ids,
        } => {
            Hub::new(config)?
                .tailor(TailorKey::new(recipe_id, appliance_ids))
                .await
        }
        CliCommand::History {
            recipe_id,
            appliance_ids,
        } => {
            Hub::new(config)?
                .history(TailorKey::new(recipe_id, appliance_ids))
                .await
        }
    }
}
