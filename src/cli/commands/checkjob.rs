//! `checkjob`: wait for the test conditions of a running job to converge.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::cli::display::{create_spinner, list_table, output, CommandOutput, ProgressBarExt};
use crate::cli::{CliContext, UserArg};
use crate::domain::ports::StreamsInstance;
use crate::infrastructure::streams::RetryPolicy;
use crate::services::condition_checker::{CheckerOutcome, CheckerResult, ConditionChecker};

#[derive(Args, Debug)]
pub struct CheckJobArgs {
    /// Id of the job under test
    pub jobid: String,

    /// Name of a condition the job publishes; repeat for several
    #[arg(long = "condition", short = 'c', required = true)]
    pub conditions: Vec<String>,

    #[command(flatten)]
    pub user: UserArg,
}

impl CommandOutput for CheckerResult {
    fn to_human(&self) -> String {
        let mut table = list_table(&["Condition", "State"]);
        for (name, status) in &self.conditions {
            table.add_row(vec![name.clone(), status.to_string()]);
        }
        let verdict = match self.outcome {
            CheckerOutcome::Passed => "passed",
            CheckerOutcome::Failed => "failed",
            CheckerOutcome::TimedOut => "timed out",
        };
        format!("{table}\nTest {verdict} after {} polls.", self.polls)
    }
}

/// Run the checker against `instance` until it reaches a verdict.
pub async fn handle(
    args: &CheckJobArgs,
    instance: Arc<dyn StreamsInstance>,
    ctx: &CliContext,
) -> Result<CheckerResult> {
    let checker = ConditionChecker::new(
        instance,
        args.jobid.clone(),
        args.conditions.iter().cloned(),
        &ctx.config.checker,
        RetryPolicy::from(&ctx.config.retry),
    );
    Ok(checker.run_to_completion().await?)
}

pub async fn execute(args: CheckJobArgs, ctx: &CliContext) -> Result<i32> {
    // The checker retries metric fetches itself
    let instance: Arc<dyn StreamsInstance> = ctx.connect_without_retry(&args.user)?;

    let spinner = create_spinner(format!("Checking conditions of job {}", args.jobid), ctx.json);
    let result = match handle(&args, instance, ctx).await {
        Ok(result) => result,
        Err(err) => {
            spinner.finish_error(format!("Check of job {} aborted", args.jobid));
            return Err(err);
        }
    };
    if result.passed {
        spinner.finish_success(format!("Job {} passed", args.jobid));
    } else {
        spinner.finish_error(format!("Job {} did not pass", args.jobid));
    }

    output(&result, ctx.json);
    Ok(i32::from(!result.passed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConditionMetricKind, Config, Job, Metric, MetricSnapshot};
    use crate::infrastructure::streams::MockStreamsInstance;

    fn ctx() -> CliContext {
        let mut config = Config::default();
        config.checker.poll_interval_ms = 1;
        config.checker.timeout_ms = 20;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_ms = 1;
        CliContext {
            config,
            json: false,
        }
    }

    fn snapshot(valid: i64, seq: i64, fail: i64) -> MetricSnapshot {
        [
            (ConditionMetricKind::Valid, valid),
            (ConditionMetricKind::Seq, seq),
            (ConditionMetricKind::Fail, fail),
        ]
        .into_iter()
        .map(|(kind, value)| Metric {
            name: kind.metric_name("c1"),
            value,
        })
        .collect()
    }

    fn args() -> CheckJobArgs {
        CheckJobArgs {
            jobid: "4".to_string(),
            conditions: vec!["c1".to_string()],
            user: UserArg::default(),
        }
    }

    #[tokio::test]
    async fn test_passing_job_renders_table() {
        let instance = Arc::new(
            MockStreamsInstance::new("inst")
                .with_job(Job {
                    id: "4".to_string(),
                    ..Default::default()
                })
                .with_scripted_metrics(vec![snapshot(1, 1, 0)]),
        );
        let port: Arc<dyn StreamsInstance> = instance.clone();

        let result = handle(&args(), port, &ctx()).await.unwrap();

        assert!(result.passed);
        let human = result.to_human();
        assert!(human.contains("CONDITION"));
        assert!(human.contains("c1"));
        assert!(human.ends_with(&format!("Test passed after {} polls.", result.polls)));
        assert_eq!(instance.cancels(), vec![("4".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error() {
        let port: Arc<dyn StreamsInstance> = Arc::new(MockStreamsInstance::new("inst"));
        let err = handle(&args(), port, &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Job not found: job_id: 4");
    }
}
