//! Persisted condition state and the states the checker resolves.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State of a condition that survives a checkpoint.
///
/// Runtime handles (the metrics sink, execution mode) are not part of this
/// struct; they are attached again on activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionState {
    pub name: String,
    pub valid: bool,
    pub failed: bool,
    pub seq: i64,
    /// What the condition variant has accumulated (counts, received tuples).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub progress: Value,
}

impl ConditionState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            valid: false,
            failed: false,
            seq: 0,
            progress: Value::Null,
        }
    }
}

/// Outcome of a single evaluation of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    NotValid,
    Fail,
}

impl Verdict {
    pub const fn from_valid(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::NotValid
        }
    }
}

/// The checker's view of a condition after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    NotValid,
    Valid,
    Fail,
}

impl ConditionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotValid => "NotValid",
            Self::Valid => "Valid",
            Self::Fail => "Fail",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the application under test executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    /// In a single local process; conditions fail fast.
    Standalone,
    /// As a job in an instance; the checker polls metrics.
    Distributed,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => f.write_str("STANDALONE"),
            Self::Distributed => f.write_str("DISTRIBUTED"),
        }
    }
}
