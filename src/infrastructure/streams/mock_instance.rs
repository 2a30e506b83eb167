//! In-memory Streams instance for testing

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AppConfigUpdate, ApplicationConfiguration, Job, JobConfig, JobFilter, MetricSnapshot,
};
use crate::domain::ports::StreamsInstance;
use crate::infrastructure::metrics::InMemoryMetrics;

/// Where the mock takes job metrics from.
#[derive(Debug)]
enum MetricSource {
    /// Each fetch pops the next snapshot; the last one repeats.
    Scripted(VecDeque<MetricSnapshot>),
    /// Live view of metrics published by locally running conditions.
    Live(InMemoryMetrics),
}

#[derive(Debug)]
struct State {
    jobs: Vec<Job>,
    app_configs: BTreeMap<String, ApplicationConfiguration>,
    metrics: MetricSource,
    transient_failures: u32,
    metric_fetches: u32,
    cancels: Vec<(String, bool)>,
    submissions: Vec<(PathBuf, JobConfig)>,
    next_job_id: u64,
    cancel_accepted: bool,
    log_trace_supported: bool,
    failing_lookups: Vec<String>,
}

/// Mock Streams instance implementation for testing
#[derive(Debug)]
pub struct MockStreamsInstance {
    instance_id: String,
    state: Mutex<State>,
}

impl MockStreamsInstance {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            state: Mutex::new(State {
                jobs: Vec::new(),
                app_configs: BTreeMap::new(),
                metrics: MetricSource::Scripted(VecDeque::new()),
                transient_failures: 0,
                metric_fetches: 0,
                cancels: Vec::new(),
                submissions: Vec::new(),
                next_job_id: 1,
                cancel_accepted: true,
                log_trace_supported: false,
                failing_lookups: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_job(self, job: Job) -> Self {
        {
            let mut state = self.state();
            if let Ok(id) = job.id.parse::<u64>() {
                state.next_job_id = state.next_job_id.max(id + 1);
            }
            state.jobs.push(job);
        }
        self
    }

    pub fn with_app_config(self, config: ApplicationConfiguration) -> Self {
        self.state().app_configs.insert(config.name.clone(), config);
        self
    }

    /// Serve `snapshots` in order, repeating the last one.
    pub fn with_scripted_metrics(self, snapshots: Vec<MetricSnapshot>) -> Self {
        self.state().metrics = MetricSource::Scripted(snapshots.into());
        self
    }

    /// Serve whatever `metrics` currently holds.
    pub fn with_live_metrics(self, metrics: InMemoryMetrics) -> Self {
        self.state().metrics = MetricSource::Live(metrics);
        self
    }

    /// Fail the next `count` metric fetches with a transient API error.
    pub fn with_transient_metric_failures(self, count: u32) -> Self {
        self.state().transient_failures = count;
        self
    }

    pub fn with_cancel_accepted(self, accepted: bool) -> Self {
        self.state().cancel_accepted = accepted;
        self
    }

    pub fn with_log_trace_support(self, supported: bool) -> Self {
        self.state().log_trace_supported = supported;
        self
    }

    /// Fail job lookups filtered by this id or name with a server error.
    pub fn with_failing_lookup(self, id_or_name: impl Into<String>) -> Self {
        self.state().failing_lookups.push(id_or_name.into());
        self
    }

    /// `(job_id, force)` of every cancel request, in order.
    pub fn cancels(&self) -> Vec<(String, bool)> {
        self.state().cancels.clone()
    }

    pub fn metric_fetches(&self) -> u32 {
        self.state().metric_fetches
    }

    pub fn submissions(&self) -> Vec<(PathBuf, JobConfig)> {
        self.state().submissions.clone()
    }

    pub fn app_config(&self, name: &str) -> Option<ApplicationConfiguration> {
        self.state().app_configs.get(name).cloned()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.state().jobs.clone()
    }
}

#[async_trait]
impl StreamsInstance for MockStreamsInstance {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    async fn get_jobs(&self, filter: &JobFilter) -> DomainResult<Vec<Job>> {
        let state = self.state();
        let failing = [&filter.id, &filter.name]
            .into_iter()
            .flatten()
            .any(|key| state.failing_lookups.contains(key));
        if failing {
            return Err(DomainError::Api {
                message: "500 Internal Server Error".to_string(),
                transient: false,
            });
        }
        Ok(state
            .jobs
            .iter()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect())
    }

    async fn submit_job(&self, bundle: &Path, job_config: &JobConfig) -> DomainResult<Job> {
        let mut state = self.state();
        let id = state.next_job_id.to_string();
        state.next_job_id += 1;

        let job = Job {
            id: id.clone(),
            name: job_config
                .job_name
                .clone()
                .unwrap_or_else(|| format!("job_{id}")),
            status: "running".to_string(),
            health: "healthy".to_string(),
            started_by: "tester".to_string(),
            job_group: format!(
                "/streams/jobgroups/{}",
                job_config.job_group.as_deref().unwrap_or("default")
            ),
            ..Default::default()
        };
        state.jobs.push(job.clone());
        state
            .submissions
            .push((bundle.to_path_buf(), job_config.clone()));
        Ok(job)
    }

    async fn cancel_job(&self, job_id: &str, force: bool) -> DomainResult<bool> {
        let mut state = self.state();
        state.cancels.push((job_id.to_string(), force));
        let Some(pos) = state.jobs.iter().position(|job| job.id == job_id) else {
            return Err(DomainError::JobNotFound(job_id.to_string()));
        };
        if state.cancel_accepted {
            state.jobs.remove(pos);
        }
        Ok(state.cancel_accepted)
    }

    async fn get_job_metrics(&self, job_id: &str) -> DomainResult<MetricSnapshot> {
        let mut state = self.state();
        if !state.jobs.iter().any(|job| job.id == job_id) {
            return Err(DomainError::JobNotFound(job_id.to_string()));
        }
        state.metric_fetches += 1;

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(DomainError::Api {
                message: "503 Service Unavailable".to_string(),
                transient: true,
            });
        }

        Ok(match &mut state.metrics {
            MetricSource::Scripted(snapshots) => {
                if snapshots.len() > 1 {
                    snapshots.pop_front().unwrap_or_default()
                } else {
                    snapshots.front().cloned().unwrap_or_default()
                }
            }
            MetricSource::Live(metrics) => metrics.snapshot(),
        })
    }

    async fn retrieve_log_trace(&self, job_id: &str, dir: &Path) -> DomainResult<Option<PathBuf>> {
        if !self.state().log_trace_supported {
            return Ok(None);
        }
        let path = dir.join(format!("job_{job_id}_logtrace.tgz"));
        tokio::fs::write(&path, b"logtrace").await?;
        Ok(Some(path))
    }

    async fn get_app_configs(
        &self,
        name: Option<&str>,
    ) -> DomainResult<Vec<ApplicationConfiguration>> {
        Ok(self
            .state()
            .app_configs
            .values()
            .filter(|config| name.is_none_or(|n| config.name == n))
            .cloned()
            .collect())
    }

    async fn create_app_config(
        &self,
        update: &AppConfigUpdate,
    ) -> DomainResult<ApplicationConfiguration> {
        let name = update.name.clone().unwrap_or_default();
        let mut state = self.state();
        if state.app_configs.contains_key(&name) {
            return Err(DomainError::AppConfigExists {
                name,
                instance: self.instance_id.clone(),
            });
        }
        let config = ApplicationConfiguration {
            name: name.clone(),
            owner: "tester".to_string(),
            description: update.description.clone().unwrap_or_default(),
            properties: update.properties.clone(),
            ..Default::default()
        };
        state.app_configs.insert(name, config.clone());
        Ok(config)
    }

    async fn update_app_config(
        &self,
        name: &str,
        update: &AppConfigUpdate,
    ) -> DomainResult<ApplicationConfiguration> {
        let mut state = self.state();
        let Some(config) = state.app_configs.get_mut(name) else {
            return Err(DomainError::AppConfigNotFound {
                name: name.to_string(),
                instance: self.instance_id.clone(),
            });
        };
        config
            .properties
            .extend(update.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(description) = &update.description {
            config.description.clone_from(description);
        }
        Ok(config.clone())
    }

    async fn delete_app_config(&self, name: &str) -> DomainResult<()> {
        if self.state().app_configs.remove(name).is_none() {
            return Err(DomainError::AppConfigNotFound {
                name: name.to_string(),
                instance: self.instance_id.clone(),
            });
        }
        Ok(())
    }
}
