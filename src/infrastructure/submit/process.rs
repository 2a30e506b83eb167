use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ExecutionMode;
use crate::domain::ports::{SubmissionResult, Submitter};

/// Return code reported when the process was killed by a signal or timed out.
const ABNORMAL_EXIT: i32 = -1;

/// Runs a standalone application to completion.
///
/// Success is the process exiting with code zero; output is inherited.
#[derive(Debug, Clone)]
pub struct ProcessSubmitter {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessSubmitter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the process if it runs longer than `limit`.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Submitter for ProcessSubmitter {
    async fn submit(&self, mode: ExecutionMode) -> DomainResult<SubmissionResult> {
        if mode != ExecutionMode::Standalone {
            return Err(DomainError::ValidationFailed(format!(
                "a local process can only run in {} mode, not {mode}",
                ExecutionMode::Standalone
            )));
        }

        debug!(program = %self.program.display(), args = ?self.args, "starting standalone run");
        let mut child = self.command().spawn().map_err(|e| {
            DomainError::SubmissionFailed(format!(
                "failed to start {}: {e}",
                self.program.display()
            ))
        })?;

        let status = match self.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "standalone run timed out, killing it");
                    child.kill().await?;
                    return Ok(SubmissionResult {
                        return_code: ABNORMAL_EXIT,
                        job_id: None,
                    });
                }
            },
            None => child.wait().await?,
        };

        let return_code = status.code().unwrap_or(ABNORMAL_EXIT);
        info!(return_code, "standalone run finished");
        Ok(SubmissionResult {
            return_code,
            job_id: None,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exit_code_is_return_code() {
        let ok = ProcessSubmitter::new("sh").args(["-c", "exit 0"]);
        let failed = ProcessSubmitter::new("sh").args(["-c", "exit 3"]);

        assert_eq!(ok.submit(ExecutionMode::Standalone).await.unwrap().return_code, 0);
        assert_eq!(failed.submit(ExecutionMode::Standalone).await.unwrap().return_code, 3);
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = ProcessSubmitter::new("sh")
            .args(["-c", "test -f marker"])
            .working_dir(dir.path());

        assert_eq!(submitter.submit(ExecutionMode::Standalone).await.unwrap().return_code, 1);
        std::fs::write(dir.path().join("marker"), "").unwrap();
        assert_eq!(submitter.submit(ExecutionMode::Standalone).await.unwrap().return_code, 0);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let slow = ProcessSubmitter::new("sh")
            .args(["-c", "sleep 5"])
            .timeout(Duration::from_millis(50));

        let result = slow.submit(ExecutionMode::Standalone).await.unwrap();
        assert_eq!(result.return_code, ABNORMAL_EXIT);
    }

    #[tokio::test]
    async fn test_missing_program_is_submission_error() {
        let missing = ProcessSubmitter::new("/nonexistent/streams-app");
        let err = missing.submit(ExecutionMode::Standalone).await.unwrap_err();
        assert!(matches!(err, DomainError::SubmissionFailed(_)));
    }

    #[tokio::test]
    async fn test_distributed_mode_rejected() {
        let submitter = ProcessSubmitter::new("true");
        let err = submitter.submit(ExecutionMode::Distributed).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
