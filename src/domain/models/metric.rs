//! Condition metric naming and metric snapshots.
//!
//! Conditions running inside a job and the checker running outside it only
//! communicate through three custom metrics per condition. Their names are a
//! wire contract with the runtime's metric system:
//! `streamsx.condition:<valid|seq|fail>:<condition name>`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace shared by every condition metric, including the trailing colon.
pub const CONDITION_METRIC_PREFIX: &str = "streamsx.condition:";

/// One of the three metrics a condition publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionMetricKind {
    Valid,
    Seq,
    Fail,
}

impl ConditionMetricKind {
    pub const ALL: [Self; 3] = [Self::Valid, Self::Seq, Self::Fail];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Seq => "seq",
            Self::Fail => "fail",
        }
    }

    /// Full metric name for `condition`.
    pub fn metric_name(self, condition: &str) -> String {
        format!("{CONDITION_METRIC_PREFIX}{}:{condition}", self.as_str())
    }
}

impl fmt::Display for ConditionMetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metric value as reported by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: i64,
}

/// Every condition metric of a job at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    metrics: HashMap<String, Metric>,
}

impl MetricSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: Metric) {
        self.metrics.insert(metric.name.clone(), metric);
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Value of `kind` for `condition`, if that metric is present.
    pub fn condition_value(&self, kind: ConditionMetricKind, condition: &str) -> Option<i64> {
        self.get(&kind.metric_name(condition)).map(|m| m.value)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl FromIterator<Metric> for MetricSnapshot {
    fn from_iter<T: IntoIterator<Item = Metric>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for metric in iter {
            snapshot.insert(metric);
        }
        snapshot
    }
}
