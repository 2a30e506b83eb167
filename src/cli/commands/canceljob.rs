//! `canceljob`: cancel jobs by id, name, or id file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::display::{output, CommandOutput};
use crate::cli::{CliContext, UserArg};
use crate::domain::ports::StreamsInstance;
use crate::services::admin::{AdminService, CancelOptions, CancelReport, JobSources};

#[derive(Args, Debug)]
pub struct CancelJobArgs {
    /// Stop the service even if jobs are running.
    #[arg(long)]
    pub force: bool,

    /// Specifies to collect the log and trace files for each processing element that is associated with the job
    #[arg(long)]
    pub collectlogs: bool,

    /// Specifies a list of job IDs.
    pub jobid: Vec<String>,

    /// Specifies a list of job IDs.
    #[arg(long, short = 'j', value_name = "job-id")]
    pub jobs: Option<String>,

    /// Specifies a list of job names
    #[arg(long)]
    pub jobnames: Option<String>,

    /// Specifies the file that contains a list of job IDs, one per line
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub user: UserArg,
}

impl CommandOutput for CancelReport {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for job in &self.canceled {
            if let Some(ref archive) = job.log_archive {
                lines.push(format!(
                    "The log files for the {} job ID will be collected in the following files: {}",
                    job.job_id,
                    archive.display()
                ));
            }
            lines.push(format!(
                "The following job ID was canceled: {}. The job was in the {} instance.",
                job.job_id, self.instance
            ));
        }
        lines.join("\n")
    }
}

/// Resolve the selection and cancel it.
pub async fn handle<I: StreamsInstance + ?Sized>(
    args: &CancelJobArgs,
    admin: &AdminService<I>,
) -> Result<CancelReport> {
    let file = match args.file {
        Some(ref path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read job ID file {}", path.display()))?,
        ),
        None => None,
    };
    let sources = JobSources {
        positional: args.jobid.clone(),
        jobs: args.jobs.clone(),
        job_names: args.jobnames.clone(),
        file,
    };
    let selection = sources.resolve()?;

    let options = CancelOptions {
        force: args.force,
        collect_logs: if args.collectlogs {
            Some(std::env::current_dir().context("Failed to resolve the current directory")?)
        } else {
            None
        },
    };

    Ok(admin.cancel_jobs(&selection, &options).await?)
}

pub async fn execute(args: CancelJobArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    let report = handle(&args, &admin).await?;

    output(&report, ctx.json);
    if !ctx.json {
        for failure in &report.failures {
            eprintln!("{failure}");
        }
    }
    Ok(report.return_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Job;
    use crate::infrastructure::streams::MockStreamsInstance;
    use std::sync::Arc;

    fn running(id: &str, name: &str) -> Job {
        Job {
            id: id.to_string(),
            name: name.to_string(),
            status: "running".to_string(),
            ..Default::default()
        }
    }

    fn args() -> CancelJobArgs {
        CancelJobArgs {
            force: false,
            collectlogs: false,
            jobid: vec![],
            jobs: None,
            jobnames: None,
            file: None,
            user: UserArg::default(),
        }
    }

    #[tokio::test]
    async fn test_cancel_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let ids = dir.path().join("ids");
        std::fs::write(&ids, "1\n\n2\n").unwrap();
        let instance = Arc::new(
            MockStreamsInstance::new("inst")
                .with_job(running("1", "a"))
                .with_job(running("2", "b")),
        );
        let admin = AdminService::new(instance.clone());

        let report = handle(
            &CancelJobArgs {
                file: Some(ids),
                force: true,
                ..args()
            },
            &admin,
        )
        .await
        .unwrap();

        assert_eq!(report.return_code(), 0);
        assert_eq!(
            report.to_human(),
            "The following job ID was canceled: 1. The job was in the inst instance.\n\
             The following job ID was canceled: 2. The job was in the inst instance."
        );
        assert!(instance.cancels().iter().all(|(_, force)| *force));
    }

    #[tokio::test]
    async fn test_missing_job_sets_return_code() {
        let admin = AdminService::new(Arc::new(
            MockStreamsInstance::new("inst").with_job(running("1", "a")),
        ));

        let report = handle(
            &CancelJobArgs {
                jobid: vec!["9,1".to_string()],
                ..args()
            },
            &admin,
        )
        .await
        .unwrap();

        assert_eq!(report.canceled.len(), 1);
        assert_eq!(report.return_code(), 1);
    }

    #[tokio::test]
    async fn test_selection_errors_abort() {
        let admin = AdminService::new(Arc::new(MockStreamsInstance::new("inst")));

        let err = handle(
            &CancelJobArgs {
                jobid: vec!["1".to_string()],
                jobs: Some("2".to_string()),
                ..args()
            },
            &admin,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Arguments jobid, --jobs, --jobnames, --file are mutually exclusive"
        );

        let err = handle(&args(), &admin).await.unwrap_err();
        assert_eq!(err.to_string(), "No jobs provided");
    }
}
