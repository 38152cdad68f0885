//! Command-line argument parsing for the kitchenhub CLI.
//!
//! This module turns the raw argument list into a [`CliCommand`].

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Poll an appliance until its manual is processed
    Watch { appliance_id: String },
    /// Requeue a failed appliance, then watch it
    Retry { appliance_id: String },
    /// Stream a tailored recipe for the given appliances
    Tailor {
        recipe_id: String,
        appliance_ids: Vec<String>,
    },
    /// Print the stored tailoring run without streaming
    History {
        recipe_id: String,
        appliance_ids: Vec<String>,
    },
    /// Arguments could not be understood; carries the reason
    Invalid(String),
}

pub const USAGE: &str = "\
usage: kitchenhub <command>

commands:
  watch <appliance-id>                  poll until the manual is processed
  retry <appliance-id>                  requeue a failed manual and watch it
  tailor <recipe-id> <appliance-id,...> stream a recipe tailored to appliances
  history <recipe-id> <appliance-id,...> show the stored tailored recipe

options:
  -V, --version                         print version
  -h, --help                            print this help

environment:
  KITCHENHUB_API_URL, KITCHENHUB_POLL_QUEUED_MS,
  KITCHENHUB_POLL_PROCESSING_MS, KITCHENHUB_LOG (default log level), RUST_LOG";

/// Split a comma-separated appliance list, dropping empty entries.
fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn tailor_args(name: &str, rest: &[String]) -> Result<(String, Vec<String>), String> {
    match rest {
        [recipe, ids] => {
            let ids = split_ids(ids);
            if ids.is_empty() {
                Err(format!("{}: select at least one appliance", name))
            } else {
                Ok((recipe.clone(), ids))
            }
        }
        _ => Err(format!("{}: expected <recipe-id> <appliance-id,...>", name)),
    }
}

/// Parse command-line arguments and return the appropriate command.
///
/// # Arguments
///
/// * `args` - Iterator of command-line arguments (typically `std::env::args()`)
///
/// # Examples
///
/// ```
/// use kitchenhub::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["kitchenhub".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let args: Vec<String> = args.skip(1).collect();

    // Flags win wherever they appear
    for arg in &args {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            _ => {}
        }
    }

    let Some((command, rest)) = args.split_first() else {
        return CliCommand::Help;
    };

    match command.as_str() {
        "watch" | "retry" => match rest {
            [id] => {
                let appliance_id = id.clone();
                if command == "watch" {
                    CliCommand::Watch { appliance_id }
                } else {
                    CliCommand::Retry { appliance_id }
                }
            }
            _ => CliCommand::Invalid(format!("{}: expected <appliance-id>", command)),
        },
        "tailor" => match tailor_args(command, rest) {
            Ok((recipe_id, appliance_ids)) => CliCommand::Tailor {
                recipe_id,
                appliance_ids,
            },
            Err(reason) => CliCommand::Invalid(reason),
        },
        "history" => match tailor_args(command, rest) {
            Ok((recipe_id, appliance_ids)) => CliCommand::History {
                recipe_id,
                appliance_ids,
            },
            Err(reason) => CliCommand::Invalid(reason),
        },
        other => CliCommand::Invalid(format!("unknown command: {}", other)),
    }
}
