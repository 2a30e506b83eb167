//! Port trait definitions (Hexagonal Architecture)
//!
//! - StreamsInstance: jobs, metrics and application configurations of an instance
//! - MetricsSink: where running conditions publish their metric triple
//! - Submitter: runs or submits the application under test

pub mod metrics_sink;
pub mod streams_instance;
pub mod submitter;

pub use metrics_sink::MetricsSink;
pub use streams_instance::StreamsInstance;
pub use submitter::{SubmissionResult, Submitter};
