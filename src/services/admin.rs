//! Job and application configuration administration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    merge_properties, AppConfigUpdate, ApplicationConfiguration, Job, JobConfig, JobFilter,
};
use crate::domain::ports::StreamsInstance;

/// Options of a job submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Job configuration overlay document read from `--jobConfig`.
    pub overlay: Option<serde_json::Value>,
    pub job_name: Option<String>,
    pub job_group: Option<String>,
    /// `name=value` submission-time parameters.
    pub parameters: Vec<String>,
}

impl SubmitOptions {
    /// Build the job configuration. Explicit options override the overlay.
    pub fn job_config(&self) -> DomainResult<JobConfig> {
        let mut config = self
            .overlay
            .clone()
            .map(JobConfig::from_overlays)
            .unwrap_or_default();
        if let Some(ref name) = self.job_name {
            config.job_name = Some(name.clone());
        }
        if let Some(ref group) = self.job_group {
            config.job_group = Some(group.clone());
        }
        for param in &self.parameters {
            config
                .add_submission_parameter(param)
                .map_err(DomainError::InvalidSubmissionParameter)?;
        }
        Ok(config)
    }
}

/// Where `canceljob` takes its jobs from. At most one source may be used.
#[derive(Debug, Clone, Default)]
pub struct JobSources {
    /// Positional job ids, each possibly a comma separated list.
    pub positional: Vec<String>,
    /// `--jobs`: comma separated job ids.
    pub jobs: Option<String>,
    /// `--jobnames`: comma separated job names.
    pub job_names: Option<String>,
    /// Contents of `--file`: one job id per line.
    pub file: Option<String>,
}

/// Jobs selected for cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSelection {
    pub ids: Vec<String>,
    pub names: Vec<String>,
}

fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

impl JobSources {
    /// Resolve the sources into ids and names.
    ///
    /// # Errors
    /// `MutuallyExclusive` when more than one source is given,
    /// `NoJobsProvided` when nothing remains after dropping blanks, and
    /// `InvalidJobId` for a non-numeric id.
    pub fn resolve(&self) -> DomainResult<JobSelection> {
        let used = [
            !self.positional.is_empty(),
            self.jobs.is_some(),
            self.job_names.is_some(),
            self.file.is_some(),
        ]
        .into_iter()
        .filter(|used| *used)
        .count();
        if used > 1 {
            return Err(DomainError::MutuallyExclusive(
                "jobid, --jobs, --jobnames, --file".to_string(),
            ));
        }

        let mut selection = JobSelection::default();
        for item in &self.positional {
            selection.ids.extend(split_list(item));
        }
        if let Some(ref jobs) = self.jobs {
            selection.ids.extend(split_list(jobs));
        }
        if let Some(ref names) = self.job_names {
            selection.names.extend(split_list(names));
        }
        if let Some(ref contents) = self.file {
            selection.ids.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }

        if selection.ids.is_empty() && selection.names.is_empty() {
            return Err(DomainError::NoJobsProvided);
        }
        if let Some(bad) = selection
            .ids
            .iter()
            .find(|id| !id.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(DomainError::InvalidJobId(bad.clone()));
        }
        Ok(selection)
    }
}

/// Options of a cancel batch.
#[derive(Debug, Clone, Default)]
pub struct CancelOptions {
    pub force: bool,
    /// Download each job's logs into this directory before canceling.
    pub collect_logs: Option<PathBuf>,
}

/// A job that was canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanceledJob {
    pub job_id: String,
    pub log_archive: Option<PathBuf>,
}

/// Result of a cancel batch. Failed items do not stop the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CancelReport {
    pub instance: String,
    pub canceled: Vec<CanceledJob>,
    /// One user-facing message per failed item, in order.
    pub failures: Vec<String>,
}

impl CancelReport {
    pub fn return_code(&self) -> i32 {
        i32::from(!self.failures.is_empty())
    }
}

/// Which jobs `lsjobs` reports.
#[derive(Debug, Clone, Default)]
pub struct JobListFilter {
    pub users: Option<String>,
    pub ids: Option<String>,
    pub names: Option<String>,
}

impl JobListFilter {
    fn matches(&self, job: &Job) -> bool {
        let listed = |list: &Option<String>, value: &str| {
            list.as_deref()
                .is_none_or(|list| split_list(list).any(|item| item == value))
        };
        listed(&self.users, &job.started_by)
            && listed(&self.ids, &job.id)
            && listed(&self.names, &job.name)
    }
}

/// Job and application configuration administration on one instance.
pub struct AdminService<I: StreamsInstance + ?Sized> {
    instance: Arc<I>,
}

impl<I: StreamsInstance + ?Sized> AdminService<I> {
    pub fn new(instance: Arc<I>) -> Self {
        Self { instance }
    }

    pub fn instance_id(&self) -> &str {
        self.instance.instance_id()
    }

    /// Submit `bundle` as a new job.
    pub async fn submit_job(&self, bundle: &Path, options: &SubmitOptions) -> DomainResult<Job> {
        let config = options.job_config()?;
        let job = self.instance.submit_job(bundle, &config).await?;
        info!(job_id = %job.id, bundle = %bundle.display(), "job submitted");
        Ok(job)
    }

    /// Cancel every selected job, isolating per-item failures.
    pub async fn cancel_jobs(
        &self,
        selection: &JobSelection,
        options: &CancelOptions,
    ) -> DomainResult<CancelReport> {
        let mut report = CancelReport {
            instance: self.instance_id().to_string(),
            ..CancelReport::default()
        };

        for id in &selection.ids {
            match self.instance.find_job(id).await {
                Ok(_) => self.cancel_one(id, options, &mut report).await,
                Err(DomainError::JobNotFound(_)) => {
                    report.failures.push(format!(
                        "The following job ID was not found {id}\n\
                         The following job ID cannot be canceled: {id}. See the previous error message"
                    ));
                }
                Err(err) => {
                    warn!(job_id = %id, error = %err, "job lookup failed");
                    report.failures.push(err.to_string());
                }
            }
        }

        for name in &selection.names {
            if name.contains(' ') {
                report
                    .failures
                    .push(DomainError::InvalidJobName(name.clone()).to_string());
                continue;
            }
            match self.instance.get_jobs(&JobFilter::by_name(name)).await {
                Ok(jobs) => match jobs.first() {
                    Some(job) => self.cancel_one(&job.id, options, &mut report).await,
                    None => report
                        .failures
                        .push(DomainError::JobNameNotFound(name.clone()).to_string()),
                },
                Err(err) => {
                    warn!(job_name = %name, error = %err, "job lookup failed");
                    report.failures.push(err.to_string());
                }
            }
        }

        Ok(report)
    }

    async fn cancel_one(&self, job_id: &str, options: &CancelOptions, report: &mut CancelReport) {
        match self.try_cancel(job_id, options).await {
            Ok(log_archive) => report.canceled.push(CanceledJob {
                job_id: job_id.to_string(),
                log_archive,
            }),
            Err(err) => {
                warn!(job_id, error = %err, "cancel failed");
                report.failures.push(err.to_string());
            }
        }
    }

    async fn try_cancel(&self, job_id: &str, options: &CancelOptions) -> DomainResult<Option<PathBuf>> {
        let mut log_archive = None;
        if let Some(ref dir) = options.collect_logs {
            log_archive = self.instance.retrieve_log_trace(job_id, dir).await?;
            if log_archive.is_none() {
                return Err(DomainError::ValidationFailed(
                    "Retrieval of job's logs is not supported in this version of IBM Streams"
                        .to_string(),
                ));
            }
        }

        if !self.instance.cancel_job(job_id, options.force).await? {
            return Err(DomainError::CancelFailed(job_id.to_string()));
        }
        debug!(job_id, force = options.force, "job canceled");
        Ok(log_archive)
    }

    /// Jobs of the instance passing `filter`.
    pub async fn list_jobs(&self, filter: &JobListFilter) -> DomainResult<Vec<Job>> {
        let jobs = self.instance.get_jobs(&JobFilter::default()).await?;
        Ok(jobs.into_iter().filter(|job| filter.matches(job)).collect())
    }

    pub async fn list_app_configs(&self) -> DomainResult<Vec<ApplicationConfiguration>> {
        self.instance.get_app_configs(None).await
    }

    /// Fetch one application configuration.
    ///
    /// # Errors
    /// `AppConfigNotFound` if it does not exist.
    pub async fn find_app_config(&self, name: &str) -> DomainResult<ApplicationConfiguration> {
        self.instance
            .get_app_configs(Some(name))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::AppConfigNotFound {
                name: name.to_string(),
                instance: self.instance_id().to_string(),
            })
    }

    /// Create an application configuration.
    ///
    /// `prop_file` lines are applied first, so `properties` override them.
    pub async fn make_app_config(
        &self,
        name: &str,
        prop_file: Option<&str>,
        properties: &[String],
        description: Option<String>,
    ) -> DomainResult<ApplicationConfiguration> {
        let mut props = BTreeMap::new();
        if let Some(contents) = prop_file {
            merge_properties(
                &mut props,
                contents.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()),
            )
            .map_err(DomainError::InvalidProperty)?;
        }
        merge_properties(&mut props, properties.iter().map(String::as_str))
            .map_err(DomainError::InvalidProperty)?;

        if !self.instance.get_app_configs(Some(name)).await?.is_empty() {
            return Err(DomainError::AppConfigExists {
                name: name.to_string(),
                instance: self.instance_id().to_string(),
            });
        }

        let update = AppConfigUpdate {
            name: Some(name.to_string()),
            properties: props,
            description,
        };
        let created = self.instance.create_app_config(&update).await?;
        info!(app_config = name, "application configuration created");
        Ok(created)
    }

    /// Add or change properties and the description of a configuration.
    pub async fn change_app_config(
        &self,
        name: &str,
        properties: &[String],
        description: Option<String>,
    ) -> DomainResult<ApplicationConfiguration> {
        let mut props = BTreeMap::new();
        merge_properties(&mut props, properties.iter().map(String::as_str))
            .map_err(DomainError::InvalidProperty)?;

        self.find_app_config(name).await?;
        let update = AppConfigUpdate {
            name: None,
            properties: props,
            description,
        };
        let updated = self.instance.update_app_config(name, &update).await?;
        info!(app_config = name, "application configuration updated");
        Ok(updated)
    }

    pub async fn remove_app_config(&self, name: &str) -> DomainResult<()> {
        self.instance.delete_app_config(name).await?;
        info!(app_config = name, "application configuration removed");
        Ok(())
    }

    /// Properties of a configuration.
    ///
    /// # Errors
    /// `AppConfigNotFound`, or `AppConfigNoProperties` when it has none.
    pub async fn app_config_properties(&self, name: &str) -> DomainResult<BTreeMap<String, String>> {
        let config = self.find_app_config(name).await?;
        if config.properties.is_empty() {
            return Err(DomainError::AppConfigNoProperties(name.to_string()));
        }
        Ok(config.properties)
    }
}
