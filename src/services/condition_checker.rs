//! Condition Convergence Checker
//!
//! Polls the condition metrics of a running job until every expected
//! condition is valid and stays valid, any condition fails, or the job stops
//! making progress for longer than the timeout. The job is canceled on every
//! exit path: gracefully after a pass, forcibly otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{CheckerConfig, ConditionMetricKind, ConditionStatus, MetricSnapshot};
use crate::domain::ports::StreamsInstance;
use crate::infrastructure::streams::RetryPolicy;

/// How a checker session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckerOutcome {
    Passed,
    Failed,
    TimedOut,
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    /// Every expected condition is valid.
    pub valid: bool,
    /// At least one condition failed.
    pub fail: bool,
    /// At least one condition's `seq` changed since the previous poll.
    pub progress: bool,
    pub conditions: BTreeMap<String, ConditionStatus>,
}

/// Final verdict of a checker session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckerResult {
    pub passed: bool,
    pub outcome: CheckerOutcome,
    pub valid: bool,
    pub fail: bool,
    pub progress: bool,
    pub conditions: BTreeMap<String, ConditionStatus>,
    /// Number of polls performed.
    pub polls: u32,
}

impl CheckerResult {
    fn new(outcome: CheckerOutcome, check: CheckSummary, polls: u32) -> Self {
        Self {
            passed: outcome == CheckerOutcome::Passed,
            outcome,
            valid: check.valid,
            fail: check.fail,
            progress: check.progress,
            conditions: check.conditions,
            polls,
        }
    }
}

/// Polls one job's condition metrics to a verdict.
pub struct ConditionChecker {
    instance: Arc<dyn StreamsInstance>,
    job_id: String,
    /// Last observed `seq` per expected condition, -1 before the first sighting.
    sequences: BTreeMap<String, i64>,
    poll_interval: Duration,
    timeout: Duration,
    stability_checks: u32,
    retry_policy: RetryPolicy,
    polls: u32,
}

impl ConditionChecker {
    pub fn new<I, S>(
        instance: Arc<dyn StreamsInstance>,
        job_id: impl Into<String>,
        conditions: I,
        config: &CheckerConfig,
        retry_policy: RetryPolicy,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instance,
            job_id: job_id.into(),
            sequences: conditions.into_iter().map(|c| (c.into(), -1)).collect(),
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
            stability_checks: config.stability_checks,
            retry_policy,
            polls: 0,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Fetch the job's metrics once and classify every expected condition.
    ///
    /// # Errors
    /// Returns the fetch error once the retry policy is exhausted.
    pub async fn check_once(&mut self) -> DomainResult<CheckSummary> {
        let snapshot = self
            .retry_policy
            .execute(|| self.instance.get_job_metrics(&self.job_id))
            .await?;
        self.polls += 1;
        Ok(self.evaluate(&snapshot))
    }

    fn evaluate(&mut self, snapshot: &MetricSnapshot) -> CheckSummary {
        let mut valid = true;
        let mut fail = false;
        let mut progress = false;
        let mut conditions = BTreeMap::new();

        for (name, last_seq) in &mut self.sequences {
            let value = |kind| snapshot.condition_value(kind, name);
            let (Some(seq), Some(failed), Some(is_valid)) = (
                value(ConditionMetricKind::Seq),
                value(ConditionMetricKind::Fail),
                value(ConditionMetricKind::Valid),
            ) else {
                // Operator still starting
                valid = false;
                conditions.insert(name.clone(), ConditionStatus::NotValid);
                continue;
            };

            if seq != *last_seq {
                progress = true;
                *last_seq = seq;
            }

            let status = if failed != 0 {
                fail = true;
                ConditionStatus::Fail
            } else if is_valid != 0 {
                ConditionStatus::Valid
            } else {
                ConditionStatus::NotValid
            };
            if status != ConditionStatus::Valid {
                valid = false;
            }
            conditions.insert(name.clone(), status);
        }

        CheckSummary {
            valid,
            fail,
            progress,
            conditions,
        }
    }

    /// Poll until the session reaches a verdict, then cancel the job.
    ///
    /// # Errors
    /// `JobNotFound` if the job does not exist at session start, or the
    /// metric fetch error once retries are exhausted. The job is canceled
    /// before a fetch error is returned.
    #[instrument(skip(self), fields(job_id = %self.job_id))]
    pub async fn run_to_completion(mut self) -> DomainResult<CheckerResult> {
        self.instance.find_job(&self.job_id).await?;

        let mut waits_without_progress: u32 = 0;
        let mut stability_budget = self.stability_checks;

        loop {
            let check = match self.check_once().await {
                Ok(check) => check,
                Err(err) => {
                    warn!(error = %err, "metric fetch failed, ending session");
                    self.cancel(true).await;
                    return Err(err);
                }
            };
            debug!(
                poll = self.polls,
                valid = check.valid,
                fail = check.fail,
                progress = check.progress,
                "polled conditions"
            );

            if check.fail {
                return Ok(self.end(CheckerOutcome::Failed, check).await);
            }

            if check.valid {
                if stability_budget == 0 {
                    return Ok(self.end(CheckerOutcome::Passed, check).await);
                }
                // Stability polls do not count toward the timeout.
                stability_budget -= 1;
            } else {
                stability_budget = self.stability_checks;

                if check.progress {
                    waits_without_progress = 0;
                } else {
                    waits_without_progress += 1;
                }

                if self.poll_interval * waits_without_progress >= self.timeout {
                    return Ok(self.end(CheckerOutcome::TimedOut, check).await);
                }
            }

            sleep(self.poll_interval).await;
        }
    }

    async fn end(&self, outcome: CheckerOutcome, check: CheckSummary) -> CheckerResult {
        let result = CheckerResult::new(outcome, check, self.polls);
        info!(
            outcome = ?result.outcome,
            polls = result.polls,
            "condition check finished"
        );
        self.cancel(!result.passed).await;
        result
    }

    async fn cancel(&self, force: bool) {
        match self.instance.cancel_job(&self.job_id, force).await {
            Ok(true) => debug!(force, "job canceled"),
            Ok(false) => warn!(force, "instance did not accept the job cancel"),
            Err(err) => warn!(force, error = %err, "failed to cancel job"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::{Job, Metric};
    use crate::infrastructure::streams::MockStreamsInstance;

    fn job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            name: format!("job_{id}"),
            ..Default::default()
        }
    }

    fn snapshot(conditions: &[(&str, i64, i64, i64)]) -> MetricSnapshot {
        conditions
            .iter()
            .flat_map(|&(name, valid, fail, seq)| {
                [
                    (ConditionMetricKind::Valid, valid),
                    (ConditionMetricKind::Fail, fail),
                    (ConditionMetricKind::Seq, seq),
                ]
                .map(|(kind, value)| Metric {
                    name: kind.metric_name(name),
                    value,
                })
            })
            .collect()
    }

    fn fast_config() -> CheckerConfig {
        CheckerConfig {
            poll_interval_ms: 1,
            timeout_ms: 5,
            stability_checks: 2,
        }
    }

    fn checker(instance: &Arc<MockStreamsInstance>, names: &[&str]) -> ConditionChecker {
        let instance: Arc<dyn StreamsInstance> = instance.clone();
        ConditionChecker::new(
            instance,
            "7",
            names.iter().copied(),
            &fast_config(),
            RetryPolicy::new(2, 1, 2),
        )
    }

    #[tokio::test]
    async fn test_check_once_missing_metrics_not_valid() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_scripted_metrics(vec![snapshot(&[("a", 1, 0, 4)])]),
        );
        let mut checker = checker(&instance, &["a", "b"]);
        assert_eq!(checker.job_id(), "7");

        let check = checker.check_once().await.unwrap();

        assert!(!check.valid);
        assert!(!check.fail);
        assert!(check.progress);
        assert_eq!(check.conditions["a"], ConditionStatus::Valid);
        assert_eq!(check.conditions["b"], ConditionStatus::NotValid);
    }

    #[tokio::test]
    async fn test_progress_only_when_seq_changes() {
        let instance = Arc::new(
            MockStreamsInstance::new("i").with_job(job("7")).with_scripted_metrics(vec![
                snapshot(&[("a", 0, 0, 1), ("b", 0, 0, 1)]),
                snapshot(&[("a", 0, 0, 1), ("b", 0, 0, 2)]),
                snapshot(&[("a", 0, 0, 1), ("b", 0, 0, 2)]),
            ]),
        );
        let mut checker = checker(&instance, &["a", "b"]);

        assert!(checker.check_once().await.unwrap().progress);
        assert!(checker.check_once().await.unwrap().progress);
        assert!(!checker.check_once().await.unwrap().progress);
    }

    #[tokio::test]
    async fn test_passes_after_stability_polls() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_scripted_metrics(vec![
                    snapshot(&[("a", 0, 0, 1)]),
                    snapshot(&[("a", 1, 0, 2)]),
                ]),
        );

        let result = checker(&instance, &["a"]).run_to_completion().await.unwrap();

        assert!(result.passed);
        assert_eq!(result.outcome, CheckerOutcome::Passed);
        // One not-valid poll, then three consecutive valid polls
        assert_eq!(result.polls, 4);
        assert_eq!(instance.cancels(), vec![("7".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_stability_window_longer_than_timeout_still_passes() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_scripted_metrics(vec![snapshot(&[("a", 1, 0, 5)])]),
        );
        let config = CheckerConfig {
            stability_checks: 6,
            ..fast_config()
        };
        let port: Arc<dyn StreamsInstance> = instance.clone();

        let result = ConditionChecker::new(port, "7", ["a"], &config, RetryPolicy::none())
            .run_to_completion()
            .await
            .unwrap();

        assert_eq!(result.outcome, CheckerOutcome::Passed);
        assert_eq!(result.polls, 7);
        assert_eq!(instance.cancels(), vec![("7".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_invalid_poll_restores_stability_budget() {
        let instance = Arc::new(
            MockStreamsInstance::new("i").with_job(job("7")).with_scripted_metrics(vec![
                snapshot(&[("a", 1, 0, 1)]),
                snapshot(&[("a", 1, 0, 2)]),
                snapshot(&[("a", 0, 0, 3)]),
                snapshot(&[("a", 1, 0, 4)]),
            ]),
        );

        let result = checker(&instance, &["a"]).run_to_completion().await.unwrap();

        assert!(result.passed);
        assert_eq!(result.polls, 6);
    }

    #[tokio::test]
    async fn test_fails_immediately_and_forces_cancel() {
        let instance = Arc::new(
            MockStreamsInstance::new("i").with_job(job("7")).with_scripted_metrics(vec![
                snapshot(&[("a", 0, 0, 1), ("b", 1, 0, 1)]),
                snapshot(&[("a", 0, 1, 2), ("b", 1, 0, 1)]),
                snapshot(&[("a", 1, 0, 3), ("b", 1, 0, 1)]),
            ]),
        );

        let result = checker(&instance, &["a", "b"])
            .run_to_completion()
            .await
            .unwrap();

        assert!(!result.passed);
        assert_eq!(result.outcome, CheckerOutcome::Failed);
        assert_eq!(result.polls, 2);
        assert!(result.fail);
        assert_eq!(result.conditions["a"], ConditionStatus::Fail);
        assert_eq!(instance.cancels(), vec![("7".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_times_out_without_progress() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_scripted_metrics(vec![snapshot(&[("a", 0, 0, 3)])]),
        );

        let result = checker(&instance, &["a"]).run_to_completion().await.unwrap();

        assert!(!result.passed);
        assert_eq!(result.outcome, CheckerOutcome::TimedOut);
        assert!(!result.progress);
        // First poll makes progress, then five polls without
        assert_eq!(result.polls, 6);
        assert_eq!(instance.cancels(), vec![("7".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_missing_job_is_fatal() {
        let instance = Arc::new(MockStreamsInstance::new("i"));

        let err = checker(&instance, &["a"])
            .run_to_completion()
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::JobNotFound(ref id) if id == "7"));
        assert!(instance.cancels().is_empty());
    }

    #[tokio::test]
    async fn test_transient_fetch_errors_are_retried() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_transient_metric_failures(2)
                .with_scripted_metrics(vec![snapshot(&[("a", 1, 0, 1)])]),
        );
        let mut checker = checker(&instance, &["a"]);

        let check = checker.check_once().await.unwrap();

        assert!(check.valid);
        assert_eq!(instance.metric_fetches(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_cancel_and_fail() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_transient_metric_failures(10),
        );

        let err = checker(&instance, &["a"])
            .run_to_completion()
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(instance.cancels(), vec![("7".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_cancel_failure_does_not_change_verdict() {
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(job("7"))
                .with_cancel_accepted(false)
                .with_scripted_metrics(vec![snapshot(&[("a", 1, 0, 1)])]),
        );

        let result = checker(&instance, &["a"]).run_to_completion().await.unwrap();

        assert!(result.passed);
        assert_eq!(instance.cancels().len(), 1);
    }
}
