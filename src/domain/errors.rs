//! Domain errors for streamtool.

use thiserror::Error;

/// Domain-level errors raised by services and the instance port.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Job not found: job_id: {0}")]
    JobNotFound(String),

    #[error("The following job name is not found: {0}. Specify a job name that is valid and try the request again.")]
    JobNameNotFound(String),

    #[error("The following job identifier is not valid: {0}. Specify a job identifier that is numeric and try the request again.")]
    InvalidJobId(String),

    #[error("{0} is not a valid job name. Either its size is longer than 1024 characters or it includes some invalid characters.")]
    InvalidJobName(String),

    #[error("The {name} application configuration does not exist in the {instance} instance")]
    AppConfigNotFound { name: String, instance: String },

    #[error("The {name} application configuration already exists in the following {instance} instance")]
    AppConfigExists { name: String, instance: String },

    #[error("The {0} application configuration has no properties defined")]
    AppConfigNoProperties(String),

    #[error("The format of the following property specification is not valid: {0}. The correct syntax is: <name>=<value>")]
    InvalidProperty(String),

    #[error("The format of the following submission-time parameter is not valid: {0}. The correct syntax is: <name>=<value>")]
    InvalidSubmissionParameter(String),

    #[error("No jobs provided")]
    NoJobsProvided,

    #[error("Arguments {0} are mutually exclusive")]
    MutuallyExclusive(String),

    #[error("One or more jobs failed to stop: {0}")]
    CancelFailed(String),

    #[error("Condition failed: {0}")]
    ConditionFailed(String),

    #[error("Test failed: {0}")]
    TestFailed(String),

    #[error("Failed to submit job: {0}")]
    SubmissionFailed(String),

    #[error("Streams REST API error: {message}")]
    Api { message: String, transient: bool },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Api { transient: true, .. })
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
