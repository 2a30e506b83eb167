//! Application configuration commands: `lsappconfig`, `mkappconfig`,
//! `chappconfig`, `rmappconfig` and `getappconfig`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::display::{format_timestamp, output, CommandOutput, Report, ReportFormat};
use crate::cli::{CliContext, UserArg};
use crate::domain::models::{ApplicationConfiguration, DisplayTimezone};
use crate::domain::ports::StreamsInstance;
use crate::services::admin::AdminService;

#[derive(Args, Debug, Default)]
pub struct LsAppConfigArgs {
    /// Specifies the presentation format
    #[arg(long, default_value = "%Tf")]
    pub fmt: ReportFormat,

    #[command(flatten)]
    pub user: UserArg,
}

#[derive(Args, Debug, Default)]
pub struct MkAppConfigArgs {
    /// Name of the app config
    pub config_name: String,

    /// Specifies a property name and value pair to add to or change in the configuration
    #[arg(long, value_name = "name=value")]
    pub property: Vec<String>,

    /// Specifies the path to a file that contains a list of application configuration properties for connecting to an external application
    #[arg(long)]
    pub propfile: Option<PathBuf>,

    /// Specifies a description for the application configuration
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub user: UserArg,
}

#[derive(Args, Debug, Default)]
pub struct ChAppConfigArgs {
    /// Name of the app config
    pub config_name: String,

    /// Specifies a property name and value pair to add to or change in the configuration
    #[arg(long, value_name = "name=value")]
    pub property: Vec<String>,

    /// Specifies a description for the application configuration
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub user: UserArg,
}

#[derive(Args, Debug, Default)]
pub struct RmAppConfigArgs {
    /// Name of the app config
    pub config_name: String,

    /// Specifies to suppress confirmation prompts.
    #[arg(long)]
    pub noprompt: bool,

    #[command(flatten)]
    pub user: UserArg,
}

#[derive(Args, Debug, Default)]
pub struct GetAppConfigArgs {
    /// Name of the app config
    pub config_name: String,

    #[command(flatten)]
    pub user: UserArg,
}

#[derive(Debug, Serialize)]
pub struct AppConfigRow {
    pub id: String,
    pub owner: String,
    pub created: String,
    pub modified: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct AppConfigListOutput {
    pub configs: Vec<AppConfigRow>,
    #[serde(skip)]
    format: ReportFormat,
}

impl CommandOutput for AppConfigListOutput {
    fn to_human(&self) -> String {
        let mut report = Report::new(["Id", "Owner", "Created", "Modified", "Description"]);
        for config in &self.configs {
            report.row(vec![
                config.id.clone(),
                config.owner.clone(),
                config.created.clone(),
                config.modified.clone(),
                config.description.clone(),
            ]);
        }
        report.render(self.format)
    }
}

/// Result of a create, update or remove.
#[derive(Debug, Serialize)]
pub struct AppConfigActionOutput {
    pub success: bool,
    pub message: String,
}

impl AppConfigActionOutput {
    fn done(name: &str, action: &str, instance: &str) -> Self {
        Self {
            success: true,
            message: format!(
                "The {name} application configuration was {action} successfully for the {instance} instance"
            ),
        }
    }
}

impl CommandOutput for AppConfigActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

/// Properties of one configuration.
#[derive(Debug, Serialize)]
pub struct AppConfigPropertiesOutput {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl CommandOutput for AppConfigPropertiesOutput {
    /// `key=value` lines; values holding JSON are pretty-printed.
    fn to_human(&self) -> String {
        self.properties
            .iter()
            .map(|(key, value)| {
                let shown = serde_json::from_str::<serde_json::Value>(value)
                    .ok()
                    .and_then(|json| serde_json::to_string_pretty(&json).ok())
                    .unwrap_or_else(|| value.clone());
                format!("{key}={shown}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn row(config: &ApplicationConfiguration, tz: DisplayTimezone, date_format: &str) -> AppConfigRow {
    AppConfigRow {
        id: config.name.clone(),
        owner: config.owner.clone(),
        created: format_timestamp(config.creation_time, tz, date_format),
        modified: format_timestamp(config.last_modified_time, tz, date_format),
        description: config.description.clone(),
    }
}

pub async fn handle_ls<I: StreamsInstance + ?Sized>(
    args: &LsAppConfigArgs,
    admin: &AdminService<I>,
    tz: DisplayTimezone,
    date_format: &str,
) -> Result<AppConfigListOutput> {
    let configs = admin.list_app_configs().await?;
    Ok(AppConfigListOutput {
        configs: configs.iter().map(|c| row(c, tz, date_format)).collect(),
        format: args.fmt,
    })
}

pub async fn handle_mk<I: StreamsInstance + ?Sized>(
    args: &MkAppConfigArgs,
    admin: &AdminService<I>,
) -> Result<AppConfigActionOutput> {
    let prop_file = match args.propfile {
        Some(ref path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read property file {}", path.display()))?,
        ),
        None => None,
    };
    admin
        .make_app_config(
            &args.config_name,
            prop_file.as_deref(),
            &args.property,
            args.description.clone(),
        )
        .await?;
    Ok(AppConfigActionOutput::done(&args.config_name, "created", admin.instance_id()))
}

pub async fn handle_ch<I: StreamsInstance + ?Sized>(
    args: &ChAppConfigArgs,
    admin: &AdminService<I>,
) -> Result<AppConfigActionOutput> {
    admin
        .change_app_config(&args.config_name, &args.property, args.description.clone())
        .await?;
    Ok(AppConfigActionOutput::done(&args.config_name, "updated", admin.instance_id()))
}

/// Remove a configuration once `confirm` approves.
///
/// Returns `None` when the removal was declined.
pub async fn handle_rm<I, F>(
    args: &RmAppConfigArgs,
    admin: &AdminService<I>,
    confirm: F,
) -> Result<Option<AppConfigActionOutput>>
where
    I: StreamsInstance + ?Sized,
    F: FnOnce(&str) -> Result<bool>,
{
    let name = &args.config_name;
    admin.find_app_config(name).await?;

    if !args.noprompt {
        let prompt = format!(
            "Do you want to remove the application configuration {name} from the {} instance? \
             Enter 'y' to continue or 'n' to cancel: ",
            admin.instance_id()
        );
        if !confirm(&prompt)? {
            return Ok(None);
        }
    }

    admin.remove_app_config(name).await?;
    Ok(Some(AppConfigActionOutput::done(name, "removed", admin.instance_id())))
}

pub async fn handle_get<I: StreamsInstance + ?Sized>(
    args: &GetAppConfigArgs,
    admin: &AdminService<I>,
) -> Result<AppConfigPropertiesOutput> {
    let properties = admin.app_config_properties(&args.config_name).await?;
    Ok(AppConfigPropertiesOutput {
        name: args.config_name.clone(),
        properties,
    })
}

/// Ask on the terminal; only `y` confirms.
fn prompt_terminal(prompt: &str) -> Result<bool> {
    let term = console::Term::stdout();
    term.write_str(prompt).context("Failed to write prompt")?;
    let answer = term.read_line().context("Failed to read answer")?;
    Ok(answer.trim() == "y")
}

pub async fn execute_ls(args: LsAppConfigArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    let listing = handle_ls(&args, &admin, ctx.timezone()?, &ctx.config.display.date_format).await?;
    output(&listing, ctx.json);
    Ok(0)
}

pub async fn execute_mk(args: MkAppConfigArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    output(&handle_mk(&args, &admin).await?, ctx.json);
    Ok(0)
}

pub async fn execute_ch(args: ChAppConfigArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    output(&handle_ch(&args, &admin).await?, ctx.json);
    Ok(0)
}

pub async fn execute_rm(args: RmAppConfigArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    if let Some(removed) = handle_rm(&args, &admin, prompt_terminal).await? {
        output(&removed, ctx.json);
    }
    Ok(0)
}

pub async fn execute_get(args: GetAppConfigArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    output(&handle_get(&args, &admin).await?, ctx.json);
    Ok(0)
}
