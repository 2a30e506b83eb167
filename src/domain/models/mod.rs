//! Domain models.

pub mod app_config;
pub mod condition;
pub mod config;
pub mod job;
pub mod metric;

pub use app_config::{merge_properties, AppConfigUpdate, ApplicationConfiguration};
pub use condition::{ConditionState, ConditionStatus, ExecutionMode, Verdict};
pub use config::{
    CheckerConfig, Config, DisplayConfig, DisplayTimezone, InstanceConfig, LoggingConfig,
    RetryConfig,
};
pub use job::{split_name_value, Job, JobConfig, JobFilter};
pub use metric::{ConditionMetricKind, Metric, MetricSnapshot, CONDITION_METRIC_PREFIX};
