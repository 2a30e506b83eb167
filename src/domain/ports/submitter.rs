//! Submission port used by the tester.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::ExecutionMode;

/// Result of submitting the application under test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Zero on success. For standalone runs this is the process exit code.
    pub return_code: i32,
    /// Id of the submitted job for distributed runs.
    pub job_id: Option<String>,
}

/// Runs or submits the application under test.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, mode: ExecutionMode) -> DomainResult<SubmissionResult>;
}
