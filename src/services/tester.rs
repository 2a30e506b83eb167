//! Declares the conditions an application under test must meet and runs it.
//!
//! Conditions are registered against named stream points before the
//! application is built. The builder takes them with
//! [`Tester::take_conditions`] and places each as a sink on its stream; the
//! tester keeps the names so the checker knows what to poll for.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::condition_checker::{CheckerResult, ConditionChecker};
use super::conditions::{
    AtLeastCount, Condition, ExactCount, RunFor, StreamContents, TupleCheck,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, ExecutionMode};
use crate::domain::ports::{StreamsInstance, SubmissionResult, Submitter};
use crate::infrastructure::streams::RetryPolicy;

/// A condition waiting to be placed in the application.
pub struct RegisteredCondition {
    pub name: String,
    /// Stream the condition observes; `None` for time-driven conditions.
    pub stream: Option<String>,
    pub condition: Box<dyn Condition>,
}

impl fmt::Debug for RegisteredCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCondition")
            .field("name", &self.name)
            .field("stream", &self.stream)
            .field("condition", &self.condition)
            .finish()
    }
}

/// Outcome of a test run.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub passed: bool,
    pub submission: SubmissionResult,
    /// Checker verdict for distributed runs that were submitted.
    pub checker: Option<CheckerResult>,
}

/// Collects conditions for one application and runs the test.
#[derive(Debug)]
pub struct Tester {
    topology: String,
    conditions: BTreeMap<String, RegisteredCondition>,
    names: BTreeSet<String>,
    result: Option<TestResult>,
}

impl Tester {
    pub fn new(topology: impl Into<String>) -> Self {
        Self {
            topology: topology.into(),
            conditions: BTreeMap::new(),
            names: BTreeSet::new(),
            result: None,
        }
    }

    pub fn topology(&self) -> &str {
        &self.topology
    }

    /// Register `condition` on `stream` under `name`.
    ///
    /// A condition already registered under the same name is replaced.
    pub fn add_condition(
        &mut self,
        stream: Option<&str>,
        name: impl Into<String>,
        condition: Box<dyn Condition>,
    ) -> &mut Self {
        let name = name.into();
        if self.names.contains(&name) {
            debug!(condition = %name, "replacing condition with the same name");
        }
        debug!(
            condition = %name,
            stream = stream.unwrap_or("-"),
            detail = %condition.describe(),
            "adding condition"
        );
        self.names.insert(name.clone());
        self.conditions.insert(
            name.clone(),
            RegisteredCondition {
                name,
                stream: stream.map(str::to_string),
                condition,
            },
        );
        self
    }

    fn add_named(&mut self, stream: &str, condition: Box<dyn Condition>) -> &mut Self {
        let name = format!("{}{}", condition.kind(), self.names.len());
        self.add_condition(Some(stream), name, condition)
    }

    /// `stream` carries exactly `count` tuples.
    pub fn tuple_count(&mut self, stream: &str, count: u64) -> &mut Self {
        self.add_named(stream, Box::new(ExactCount::new(count)))
    }

    /// `stream` carries at least `count` tuples.
    pub fn tuple_count_at_least(&mut self, stream: &str, count: u64) -> &mut Self {
        self.add_named(stream, Box::new(AtLeastCount::new(count)))
    }

    /// `stream` carries exactly `expected`, in order.
    pub fn contents(&mut self, stream: &str, expected: Vec<Value>) -> &mut Self {
        self.add_named(stream, Box::new(StreamContents::ordered(expected)))
    }

    /// `stream` carries exactly `expected`, in any order.
    pub fn unordered_contents(&mut self, stream: &str, expected: Vec<Value>) -> &mut Self {
        self.add_named(stream, Box::new(StreamContents::unordered(expected)))
    }

    /// Every tuple on `stream` satisfies `predicate`.
    pub fn tuple_check(
        &mut self,
        stream: &str,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.add_named(stream, Box::new(TupleCheck::new(predicate)))
    }

    /// The application runs for at least `duration`.
    pub fn run_for(&mut self, duration: Duration) -> &mut Self {
        self.add_condition(None, RunFor::NAME, Box::new(RunFor::new(duration)))
    }

    /// Names of every registered condition, including taken ones.
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Hand the registered conditions to the application builder.
    pub fn take_conditions(&mut self) -> Vec<RegisteredCondition> {
        std::mem::take(&mut self.conditions).into_values().collect()
    }

    /// Result of the last run.
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    /// Run the application and decide whether the test passed.
    ///
    /// Standalone: passed iff the process exits with code zero.
    /// Distributed: submit, then check the conditions of the submitted job
    /// against `instance`. Metric fetches are retried with `config.retry`,
    /// so `instance` should not retry on its own.
    ///
    /// # Errors
    /// Submission errors, a distributed run without `instance`, and fatal
    /// checker errors.
    pub async fn run(
        &mut self,
        mode: ExecutionMode,
        submitter: &dyn Submitter,
        instance: Option<Arc<dyn StreamsInstance>>,
        config: &Config,
    ) -> DomainResult<&TestResult> {
        info!(topology = %self.topology, %mode, conditions = self.names.len(), "starting test");

        let instance = match (mode, instance) {
            (ExecutionMode::Distributed, None) => {
                return Err(DomainError::ValidationFailed(
                    "a distributed test needs a Streams instance".to_string(),
                ))
            }
            (_, instance) => instance,
        };

        let submission = submitter.submit(mode).await?;
        let result = match (mode, instance) {
            (ExecutionMode::Distributed, Some(instance)) => {
                self.check_submitted(submission, instance, config).await?
            }
            _ => TestResult {
                passed: submission.return_code == 0,
                submission,
                checker: None,
            },
        };

        info!(topology = %self.topology, passed = result.passed, "test finished");
        Ok(self.result.insert(result))
    }

    async fn check_submitted(
        &self,
        submission: SubmissionResult,
        instance: Arc<dyn StreamsInstance>,
        config: &Config,
    ) -> DomainResult<TestResult> {
        if submission.return_code != 0 {
            warn!(
                return_code = submission.return_code,
                "failed to submit job to distributed instance"
            );
            return Ok(TestResult {
                passed: false,
                submission,
                checker: None,
            });
        }
        let Some(job_id) = submission.job_id.clone() else {
            return Err(DomainError::SubmissionFailed(
                "submission succeeded without a job id".to_string(),
            ));
        };

        let checker = ConditionChecker::new(
            instance,
            job_id,
            self.names.iter().cloned(),
            &config.checker,
            RetryPolicy::from(&config.retry),
        );
        let verdict = checker.run_to_completion().await?;
        Ok(TestResult {
            passed: verdict.passed,
            submission,
            checker: Some(verdict),
        })
    }

    /// As [`Tester::run`], failing when the test did not pass.
    ///
    /// # Errors
    /// `TestFailed` when the test did not pass, plus every error of `run`.
    pub async fn test(
        &mut self,
        mode: ExecutionMode,
        submitter: &dyn Submitter,
        instance: Option<Arc<dyn StreamsInstance>>,
        config: &Config,
    ) -> DomainResult<&TestResult> {
        let topology = self.topology.clone();
        let result = self.run(mode, submitter, instance, config).await?;
        if result.passed {
            Ok(result)
        } else {
            Err(DomainError::TestFailed(format!(
                "Test failed for topology: {topology}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Job;
    use crate::infrastructure::streams::MockStreamsInstance;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedSubmitter(SubmissionResult);

    #[async_trait]
    impl Submitter for FixedSubmitter {
        async fn submit(&self, _mode: ExecutionMode) -> DomainResult<SubmissionResult> {
            Ok(self.0.clone())
        }
    }

    fn exit(return_code: i32) -> FixedSubmitter {
        FixedSubmitter(SubmissionResult {
            return_code,
            job_id: None,
        })
    }

    #[test]
    fn test_auto_names_use_registration_ordinal() {
        let mut tester = Tester::new("app");
        tester
            .tuple_count("s1", 3)
            .contents("s1", vec![json!(1)])
            .tuple_count_at_least("s2", 1)
            .unordered_contents("s2", vec![])
            .tuple_check("s3", |t| t.is_number())
            .run_for(Duration::from_secs(5));

        let names: Vec<&str> = tester.condition_names().collect();
        assert_eq!(
            names,
            vec![
                "AtLeastCount2",
                "ExactCount0",
                "StreamContents1",
                "TestRunTime",
                "TupleCheck4",
                "UnorderedStreamContents3",
            ]
        );
    }

    #[test]
    fn test_name_collision_replaces_condition() {
        let mut tester = Tester::new("app");
        tester
            .add_condition(Some("a"), "same", Box::new(ExactCount::new(1)))
            .add_condition(Some("b"), "same", Box::new(ExactCount::new(2)));

        let taken = tester.take_conditions();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].stream.as_deref(), Some("b"));
    }

    #[test]
    fn test_take_conditions_keeps_names() {
        let mut tester = Tester::new("app");
        tester.tuple_count("s", 1).run_for(Duration::from_secs(1));
        assert_eq!(tester.topology(), "app");

        let taken = tester.take_conditions();
        assert_eq!(taken.len(), 2);
        assert!(taken.iter().any(|c| c.name == "TestRunTime" && c.stream.is_none()));
        assert!(tester.take_conditions().is_empty());
        assert_eq!(tester.condition_names().count(), 2);
    }

    #[tokio::test]
    async fn test_standalone_passes_on_zero_exit() {
        let mut tester = Tester::new("app");
        let config = Config::default();

        let result = tester
            .run(ExecutionMode::Standalone, &exit(0), None, &config)
            .await
            .unwrap();
        assert!(result.passed);

        let err = tester
            .test(ExecutionMode::Standalone, &exit(1), None, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TestFailed(ref msg) if msg.contains("app")));
        assert!(!tester.result().unwrap().passed);
    }

    #[tokio::test]
    async fn test_distributed_requires_instance() {
        let mut tester = Tester::new("app");
        let err = tester
            .run(ExecutionMode::Distributed, &exit(0), None, &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_distributed_submit_failure_skips_checker() {
        let instance = Arc::new(MockStreamsInstance::new("i"));
        let port: Arc<dyn StreamsInstance> = instance.clone();
        let mut tester = Tester::new("app");
        tester.tuple_count("s", 1);

        let result = tester
            .run(
                ExecutionMode::Distributed,
                &exit(2),
                Some(port),
                &Config::default(),
            )
            .await
            .unwrap();

        assert!(!result.passed);
        assert!(result.checker.is_none());
        assert_eq!(instance.metric_fetches(), 0);
    }

    #[tokio::test]
    async fn test_distributed_runs_checker_on_submitted_job() {
        use crate::domain::models::{ConditionMetricKind, Metric, MetricSnapshot};

        let snapshot: MetricSnapshot = [
            (ConditionMetricKind::Valid, 1),
            (ConditionMetricKind::Fail, 0),
            (ConditionMetricKind::Seq, 1),
        ]
        .into_iter()
        .map(|(kind, value)| Metric {
            name: kind.metric_name("ExactCount0"),
            value,
        })
        .collect();
        let instance = Arc::new(
            MockStreamsInstance::new("i")
                .with_job(Job {
                    id: "12".to_string(),
                    ..Default::default()
                })
                .with_scripted_metrics(vec![snapshot]),
        );
        let submitter = FixedSubmitter(SubmissionResult {
            return_code: 0,
            job_id: Some("12".to_string()),
        });
        let mut config = Config::default();
        config.checker.poll_interval_ms = 1;
        config.checker.timeout_ms = 10;

        let port: Arc<dyn StreamsInstance> = instance.clone();

        let mut tester = Tester::new("app");
        tester.tuple_count("s", 1);
        let result = tester
            .test(
                ExecutionMode::Distributed,
                &submitter,
                Some(port),
                &config,
            )
            .await
            .unwrap();

        assert!(result.passed);
        assert_eq!(result.checker.as_ref().unwrap().polls, 3);
        assert_eq!(instance.cancels(), vec![("12".to_string(), false)]);
    }
}
