//! streamtool CLI entry point.

use anyhow::Result;
use clap::Parser;

use streamtool::cli::{handle_error, run_command, Cli, CliContext};
use streamtool::domain::models::Config;
use streamtool::infrastructure::config::ConfigLoader;
use streamtool::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let rc = run().await;
    std::process::exit(rc);
}

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Everything holding resources, such as the log writer guard, is dropped
/// before the process exits.
async fn run() -> i32 {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            handle_error(&err, cli.json);
            return 1;
        }
    };

    let log_config = LogConfig::from(&config.logging).verbose(cli.verbose);
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => {
            handle_error(&err, cli.json);
            return 1;
        }
    };

    let ctx = CliContext::new(config, &cli);
    run_command(cli.command, &ctx).await
}
