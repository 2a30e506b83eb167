//! Command-line interface.
//!
//! Each subcommand lives in [`commands`] as an `Args` struct plus an
//! `execute` function returning the process return code. Failures are
//! printed to stderr by [`run_command`] and turned into return code 1.

pub mod commands;
pub mod display;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::domain::models::{Config, DisplayTimezone};
use crate::infrastructure::streams::{RetryPolicy, StreamsClientConfig, StreamsRestClient};
use crate::services::AdminService;

use commands::appconfig::{
    ChAppConfigArgs, GetAppConfigArgs, LsAppConfigArgs, MkAppConfigArgs, RmAppConfigArgs,
};
use commands::canceljob::CancelJobArgs;
use commands::checkjob::CheckJobArgs;
use commands::lsjobs::LsJobsArgs;
use commands::submitjob::SubmitJobArgs;

#[derive(Parser, Debug)]
#[command(name = "streamtool")]
#[command(about = "Control commands for an IBM Streams instance", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable SSL verification.
    #[arg(long, global = true)]
    pub disable_ssl_verify: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of the project files
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit an application bundle
    #[command(name = "submitjob")]
    SubmitJob(SubmitJobArgs),

    /// Cancel a job.
    #[command(name = "canceljob")]
    CancelJob(CancelJobArgs),

    /// List the jobs of the instance
    #[command(name = "lsjobs")]
    LsJobs(LsJobsArgs),

    /// Retrieve a list of configurations for making a connection to an external application
    #[command(name = "lsappconfig")]
    LsAppConfig(LsAppConfigArgs),

    /// Creates a configuration that enables connection to an external application
    #[command(name = "mkappconfig")]
    MkAppConfig(MkAppConfigArgs),

    /// Change the configuration properties that are used to make a connection to an external application
    #[command(name = "chappconfig")]
    ChAppConfig(ChAppConfigArgs),

    /// Removes a configuration that is used for making a connection to an external application
    #[command(name = "rmappconfig")]
    RmAppConfig(RmAppConfigArgs),

    /// Displays the properties of a configuration that enables connection to an external application
    #[command(name = "getappconfig")]
    GetAppConfig(GetAppConfigArgs),

    /// Wait for the test conditions of a running job to converge
    #[command(name = "checkjob")]
    CheckJob(CheckJobArgs),
}

/// `--User/-U`, accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct UserArg {
    /// Specifies an IBM Streams user ID that has authority to run the command.
    #[arg(long = "User", short = 'U', value_name = "user")]
    pub user: Option<String>,
}

/// Settings shared by every command invocation.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: Config,
    pub json: bool,
}

impl CliContext {
    /// Build the context, applying global flags on top of the loaded config.
    pub fn new(mut config: Config, cli: &Cli) -> Self {
        if cli.disable_ssl_verify {
            config.instance.verify_ssl = false;
        }
        Self {
            config,
            json: cli.json,
        }
    }

    /// REST client for the configured instance.
    pub fn connect(&self, user: &UserArg) -> Result<Arc<StreamsRestClient>> {
        let client_config = StreamsClientConfig::from_config(&self.config, user.user.as_deref())?;
        build_client(client_config)
    }

    /// REST client whose requests are not retried, for callers that retry
    /// on their own.
    pub fn connect_without_retry(&self, user: &UserArg) -> Result<Arc<StreamsRestClient>> {
        let client_config = StreamsClientConfig {
            retry_policy: RetryPolicy::none(),
            ..StreamsClientConfig::from_config(&self.config, user.user.as_deref())?
        };
        build_client(client_config)
    }

    pub fn admin(&self, user: &UserArg) -> Result<AdminService<StreamsRestClient>> {
        Ok(AdminService::new(self.connect(user)?))
    }

    pub fn timezone(&self) -> Result<DisplayTimezone> {
        self.config
            .display
            .resolve_timezone()
            .map_err(|tz| anyhow::anyhow!("Invalid display timezone: {tz}"))
    }
}

fn build_client(client_config: StreamsClientConfig) -> Result<Arc<StreamsRestClient>> {
    let client = StreamsRestClient::with_config(client_config)
        .context("Failed to create the Streams REST client")?;
    Ok(Arc::new(client))
}

/// Run one command to completion and return the process return code.
pub async fn run_command(command: Commands, ctx: &CliContext) -> i32 {
    let result = match command {
        Commands::SubmitJob(args) => commands::submitjob::execute(args, ctx).await,
        Commands::CancelJob(args) => commands::canceljob::execute(args, ctx).await,
        Commands::LsJobs(args) => commands::lsjobs::execute(args, ctx).await,
        Commands::LsAppConfig(args) => commands::appconfig::execute_ls(args, ctx).await,
        Commands::MkAppConfig(args) => commands::appconfig::execute_mk(args, ctx).await,
        Commands::ChAppConfig(args) => commands::appconfig::execute_ch(args, ctx).await,
        Commands::RmAppConfig(args) => commands::appconfig::execute_rm(args, ctx).await,
        Commands::GetAppConfig(args) => commands::appconfig::execute_get(args, ctx).await,
        Commands::CheckJob(args) => commands::checkjob::execute(args, ctx).await,
    };

    match result {
        Ok(rc) => rc,
        Err(err) => {
            handle_error(&err, ctx.json);
            1
        }
    }
}

/// Print a command failure to stderr.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    tracing::debug!(error = ?err, "command failed");
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": format!("{err:#}") });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{err:#}");
    }
}
