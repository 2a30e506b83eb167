//! Streams instance port.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AppConfigUpdate, ApplicationConfiguration, Job, JobConfig, JobFilter, MetricSnapshot,
};

/// Operations on a single Streams instance.
///
/// Abstracts the Streams REST API so the condition checker and the CLI
/// commands can run against the real service or an in-memory double.
#[async_trait]
pub trait StreamsInstance: Send + Sync {
    /// Identifier of the instance, used in user-facing messages.
    fn instance_id(&self) -> &str;

    /// List jobs matching `filter`.
    async fn get_jobs(&self, filter: &JobFilter) -> DomainResult<Vec<Job>>;

    /// Fetch one job by id.
    ///
    /// Returns [`DomainError::JobNotFound`] if zero or more than one job
    /// matches.
    async fn find_job(&self, job_id: &str) -> DomainResult<Job> {
        let mut jobs = self.get_jobs(&JobFilter::by_id(job_id)).await?;
        if jobs.len() == 1 {
            Ok(jobs.remove(0))
        } else {
            Err(DomainError::JobNotFound(job_id.to_string()))
        }
    }

    /// Upload `bundle` and submit it as a new job.
    async fn submit_job(&self, bundle: &Path, job_config: &JobConfig) -> DomainResult<Job>;

    /// Cancel a job. Returns whether the instance accepted the cancel.
    async fn cancel_job(&self, job_id: &str, force: bool) -> DomainResult<bool>;

    /// Complete snapshot of the condition metrics of every operator of a job.
    async fn get_job_metrics(&self, job_id: &str) -> DomainResult<MetricSnapshot>;

    /// Download the job's log and trace archive into `dir`.
    ///
    /// Returns `None` when the instance does not support log retrieval.
    async fn retrieve_log_trace(&self, job_id: &str, dir: &Path) -> DomainResult<Option<PathBuf>>;

    /// List application configurations, optionally only the one named `name`.
    async fn get_app_configs(&self, name: Option<&str>)
        -> DomainResult<Vec<ApplicationConfiguration>>;

    async fn create_app_config(&self, update: &AppConfigUpdate)
        -> DomainResult<ApplicationConfiguration>;

    async fn update_app_config(
        &self,
        name: &str,
        update: &AppConfigUpdate,
    ) -> DomainResult<ApplicationConfiguration>;

    async fn delete_app_config(&self, name: &str) -> DomainResult<()>;
}
