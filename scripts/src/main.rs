use std::process::ExitCode;

use clap::Parser;
use migration_scripts::{cli::Cli, constants::DEFAULT_LOG_FILTER};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let Cli {
        config,
        deployments_path,
        command,
    } = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().pretty().with_env_filter(filter).init();

    match command.run(&config, &deployments_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
