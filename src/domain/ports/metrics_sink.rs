//! Metrics sink port.

/// Destination for the custom metrics a condition publishes.
///
/// Called once per evaluation from the thread executing the condition, so
/// implementations must be cheap and thread-safe.
pub trait MetricsSink: Send + Sync {
    fn publish(&self, name: &str, value: i64);
}
