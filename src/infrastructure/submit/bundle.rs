use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ExecutionMode, JobConfig};
use crate::domain::ports::{StreamsInstance, SubmissionResult, Submitter};

/// Submits an application bundle to a Streams instance.
pub struct BundleSubmitter {
    instance: Arc<dyn StreamsInstance>,
    bundle: PathBuf,
    job_config: JobConfig,
}

impl BundleSubmitter {
    pub fn new(
        instance: Arc<dyn StreamsInstance>,
        bundle: impl Into<PathBuf>,
        job_config: JobConfig,
    ) -> Self {
        Self {
            instance,
            bundle: bundle.into(),
            job_config,
        }
    }
}

#[async_trait]
impl Submitter for BundleSubmitter {
    async fn submit(&self, mode: ExecutionMode) -> DomainResult<SubmissionResult> {
        if mode != ExecutionMode::Distributed {
            return Err(DomainError::ValidationFailed(format!(
                "a bundle can only be submitted in {} mode, not {mode}",
                ExecutionMode::Distributed
            )));
        }

        let job = self
            .instance
            .submit_job(&self.bundle, &self.job_config)
            .await?;
        info!(
            job_id = %job.id,
            job_name = %job.name,
            instance = self.instance.instance_id(),
            "bundle submitted"
        );

        Ok(SubmissionResult {
            return_code: 0,
            job_id: Some(job.id),
        })
    }
}
