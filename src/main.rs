use color_eyre::Result;
use kitchenhub::cli::{parse_args, run_cli_command, CliCommand};
use kitchenhub::config::ClientConfig;
use kitchenhub::logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let command = parse_args(std::env::args());
    // Version and help never need configuration
    if matches!(command, CliCommand::Version | CliCommand::Help) {
        return run_cli_command(command, ClientConfig::default()).await;
    }

    let config = ClientConfig::from_env()?;
    logging::init(&config.log_level);
    tracing::debug!("using hub at {}", config.base_url);

    run_cli_command(command, config).await
}
