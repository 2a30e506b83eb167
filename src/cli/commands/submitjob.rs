//! `submitjob`: submit an application bundle.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::display::{output, CommandOutput};
use crate::cli::{CliContext, UserArg};
use crate::domain::ports::StreamsInstance;
use crate::services::admin::{AdminService, SubmitOptions};

#[derive(Args, Debug)]
pub struct SubmitJobArgs {
    /// Location of sab file.
    #[arg(value_name = "sab-pathname")]
    pub sabfile: PathBuf,

    /// Specifies the name of an external file that defines a job configuration overlay
    #[arg(long = "jobConfig", short = 'g')]
    pub job_config: Option<PathBuf>,

    /// Specifies the name of the job.
    #[arg(long)]
    pub jobname: Option<String>,

    /// Specifies the job group
    #[arg(long, short = 'J')]
    pub jobgroup: Option<String>,

    /// Specifies the path and file name of the output file in which the command writes the list of submitted job IDs
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Specifies a submission-time parameter and value for the job
    #[arg(short = 'P', long = "P", value_name = "name=value")]
    pub params: Vec<String>,

    #[command(flatten)]
    pub user: UserArg,
}

#[derive(Debug, Serialize)]
pub struct SubmitOutput {
    pub instance: String,
    pub job_id: String,
    pub job_name: String,
}

impl CommandOutput for SubmitOutput {
    fn to_human(&self) -> String {
        format!(
            "The following number of applications were submitted to the {} instance: 1.",
            self.instance
        )
    }
}

/// Submit the bundle and write `--outfile`.
pub async fn handle<I: StreamsInstance + ?Sized>(
    args: &SubmitJobArgs,
    admin: &AdminService<I>,
) -> Result<SubmitOutput> {
    let overlay = match args.job_config {
        Some(ref path) => Some(read_overlay(path)?),
        None => None,
    };
    let options = SubmitOptions {
        overlay,
        job_name: args.jobname.clone(),
        job_group: args.jobgroup.clone(),
        parameters: args.params.clone(),
    };

    let job = admin.submit_job(&args.sabfile, &options).await?;

    if let Some(ref outfile) = args.outfile {
        std::fs::write(outfile, format!("{}\n", job.id))
            .with_context(|| format!("Failed to write job ID to {}", outfile.display()))?;
    }

    Ok(SubmitOutput {
        instance: admin.instance_id().to_string(),
        job_id: job.id,
        job_name: job.name,
    })
}

fn read_overlay(path: &Path) -> Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job configuration {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Job configuration {} is not valid JSON", path.display()))
}

pub async fn execute(args: SubmitJobArgs, ctx: &CliContext) -> Result<i32> {
    let admin = ctx.admin(&args.user)?;
    let submitted = handle(&args, &admin).await?;
    output(&submitted, ctx.json);
    if !ctx.json {
        eprintln!("Submitted job IDs: {}", submitted.job_id);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::streams::MockStreamsInstance;
    use std::sync::Arc;

    fn args(dir: &Path) -> SubmitJobArgs {
        SubmitJobArgs {
            sabfile: dir.join("app.sab"),
            job_config: None,
            jobname: Some("nightly".to_string()),
            jobgroup: None,
            outfile: Some(dir.join("ids.txt")),
            params: vec!["rate=5".to_string()],
            user: UserArg::default(),
        }
    }

    #[tokio::test]
    async fn test_submit_writes_outfile() {
        let dir = tempfile::tempdir().unwrap();
        let instance = Arc::new(MockStreamsInstance::new("inst"));
        let admin = AdminService::new(instance.clone());

        let submitted = handle(&args(dir.path()), &admin).await.unwrap();

        assert_eq!(
            submitted.to_human(),
            "The following number of applications were submitted to the inst instance: 1."
        );
        let written = std::fs::read_to_string(dir.path().join("ids.txt")).unwrap();
        assert_eq!(written, format!("{}\n", submitted.job_id));

        let (_, config) = instance.submissions().remove(0);
        assert_eq!(config.job_name.as_deref(), Some("nightly"));
        assert_eq!(config.submission_parameters["rate"], "5");
    }

    #[tokio::test]
    async fn test_submit_reads_overlay_file() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = dir.path().join("overlay.json");
        std::fs::write(
            &overlay,
            r#"{"jobConfigOverlays": [{"jobConfig": {"jobGroup": "team"}}]}"#,
        )
        .unwrap();
        let instance = Arc::new(MockStreamsInstance::new("inst"));
        let admin = AdminService::new(instance.clone());

        let mut args = args(dir.path());
        args.job_config = Some(overlay);
        args.outfile = None;
        handle(&args, &admin).await.unwrap();

        let (_, config) = instance.submissions().remove(0);
        assert_eq!(config.job_group.as_deref(), Some("team"));
    }

    #[tokio::test]
    async fn test_malformed_parameter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let admin = AdminService::new(Arc::new(MockStreamsInstance::new("inst")));
        let mut args = args(dir.path());
        args.params = vec!["novalue".to_string()];

        let err = handle(&args, &admin).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("submission-time parameter is not valid: novalue"));
    }
}
