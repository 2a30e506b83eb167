//! `lsjobs`: list the jobs of the instance.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::display::{iso_timestamp, now_timestamp, output, CommandOutput, Report, ReportFormat};
use crate::cli::{CliContext, UserArg};
use crate::domain::models::{DisplayTimezone, Job};
use crate::domain::ports::StreamsInstance;
use crate::services::admin::{AdminService, JobListFilter};

#[derive(Args, Debug, Default)]
pub struct LsJobsArgs {
    /// Specifies a list of job IDs.
    #[arg(long)]
    pub jobs: Option<String>,

    /// Specifies to only select jobs that were started by the specified user IDs
    #[arg(long)]
    pub users: Option<String>,

    /// Specifies a list of job names
    #[arg(long)]
    pub jobnames: Option<String>,

    /// Specifies the presentation format
    #[arg(long, default_value = "%Tf")]
    pub fmt: ReportFormat,

    /// Specifies to exclude headings from the report
    #[arg(long)]
    pub xheaders: bool,

    /// Reports also the product version of each job
    #[arg(long)]
    pub long: bool,

    /// Specifies to show a time stamp in the output to indicate when the command was run.
    #[arg(long)]
    pub showtimestamp: bool,

    #[command(flatten)]
    pub user: UserArg,
}

/// One listed job, as displayed.
#[derive(Debug, Serialize)]
pub struct JobRow {
    pub id: String,
    pub state: String,
    pub healthy: String,
    pub user: String,
    pub date: String,
    pub name: String,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_version: Option<String>,
}

impl JobRow {
    fn new(job: &Job, tz: DisplayTimezone, long: bool) -> Self {
        Self {
            id: job.id.clone(),
            state: job.status_display(),
            healthy: if job.is_healthy() { "yes" } else { "no" }.to_string(),
            user: job.started_by.clone(),
            date: iso_timestamp(job.submit_time, tz),
            name: job.name.clone(),
            group: job.job_group_short().to_string(),
            product_version: long.then(|| job.product_version.clone()),
        }
    }

    fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.id.clone(),
            self.state.clone(),
            self.healthy.clone(),
            self.user.clone(),
            self.date.clone(),
            self.name.clone(),
            self.group.clone(),
        ];
        cells.extend(self.product_version.clone());
        cells
    }
}

#[derive(Debug, Serialize)]
pub struct JobListOutput {
    /// `None` when headers are suppressed.
    pub instance: Option<String>,
    pub timestamp: Option<String>,
    pub jobs: Vec<JobRow>,
    #[serde(skip)]
    format: ReportFormat,
    #[serde(skip)]
    long: bool,
}

impl CommandOutput for JobListOutput {
    fn to_human(&self) -> String {
        let mut headers = vec!["Id", "State", "Healthy", "User", "Date", "Name", "Group"];
        if self.long {
            headers.push("ProductVersion");
        }

        let mut report = Report::new(headers).show_headers(self.instance.is_some());
        if let Some(ref timestamp) = self.timestamp {
            report = report.preamble(format!("Date: {timestamp}"));
        }
        if let Some(ref instance) = self.instance {
            report = report.preamble(format!("Instance: {instance}"));
        }
        for job in &self.jobs {
            report.row(job.cells());
        }
        report.render(self.format)
    }
}

pub async fn handle<I: StreamsInstance + ?Sized>(
    args: &LsJobsArgs,
    admin: &AdminService<I>,
    tz: DisplayTimezone,
) -> Result<JobListOutput> {
    let filter = JobListFilter {
        users: args.users.clone(),
        ids: args.jobs.clone(),
        names: args.jobnames.clone(),
    };
    let jobs = admin.list_jobs(&filter).await?;

    Ok(JobListOutput {
        instance: (!args.xheaders).then(|| admin.instance_id().to_string()),
        timestamp: (args.showtimestamp && !args.xheaders).then(|| now_timestamp(tz)),
        jobs: jobs.iter().map(|job| JobRow::new(job, tz, args.long)).collect(),
        format: args.fmt,
        long: args.long,
    })
}

pub async fn execute(args: LsJobsArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    let listing = handle(&args, &admin, ctx.timezone()?).await?;
    output(&listing, ctx.json);
    Ok(0)
}
