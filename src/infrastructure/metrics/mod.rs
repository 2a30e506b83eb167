//! In-process metric storage.
//!
//! `InMemoryMetrics` is the sink used when conditions run inside the local
//! process (standalone runs, tests). It doubles as a snapshot source so the
//! same values can be read back the way the checker reads a job's metrics.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::models::{Metric, MetricSnapshot, CONDITION_METRIC_PREFIX};
use crate::domain::ports::MetricsSink;

/// Thread-safe, cloneable metric store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetrics {
    values: Arc<RwLock<HashMap<String, i64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// Snapshot of every condition metric currently held.
    pub fn snapshot(&self) -> MetricSnapshot {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(name, _)| name.starts_with(CONDITION_METRIC_PREFIX))
            .map(|(name, value)| Metric {
                name: name.clone(),
                value: *value,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl MetricsSink for InMemoryMetrics {
    fn publish(&self, name: &str, value: i64) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }
}
