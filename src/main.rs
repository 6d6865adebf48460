//! relaybill - channel balance reconciliation
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use relaybill::cli::{Cli, CommandOutput, Commands, JobCommand, balance, job, output};
use relaybill::core::logging::{self, LogSettings};
use relaybill::storage::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config::resolve(cli.config.as_deref());
    let settings = LogSettings::resolve(
        cli.log_level.as_deref(),
        config
            .as_ref()
            .ok()
            .and_then(|c| c.general.log_level.as_deref()),
        cli.json_output,
        cli.verbose,
    );
    logging::init(&settings);

    let pretty = cli.pretty;
    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{}", e);
            match output::render_json(&CommandOutput::failure(&e), pretty) {
                Ok(json) => println!("{json}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli, config: &Config) -> relaybill::Result<()> {
    let pretty = cli.pretty;
    let channels = cli.channels.as_deref();

    match cli.command {
        Commands::Refresh(args) => balance::refresh(&args, config, channels, pretty).await,
        Commands::RefreshAll => balance::refresh_all(config, channels, pretty).await,
        Commands::Daemon(args) => balance::daemon(&args, config, channels, pretty).await,
        Commands::Job(JobCommand::Wait(args)) => job::wait(&args, config, pretty).await,
    }
}
