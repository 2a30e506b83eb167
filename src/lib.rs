//! streamtool - IBM Streams administration and runtime condition testing
//!
//! streamtool drives a Streams instance over its REST API: it submits and
//! cancels jobs, manages application configurations, and checks that a job
//! under test converges on its declared conditions.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the ports to the instance
//! - **Service Layer** (`services`): conditions, the convergence checker,
//!   the tester, and administration
//! - **Infrastructure Layer** (`infrastructure`): REST client, configuration,
//!   logging, metrics, and submitters
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use streamtool::services::Tester;
//!
//! let mut tester = Tester::new("sample::Words");
//! tester.tuple_count("words", 100);
//! tester.contents("words", vec!["a".into(), "b".into()]);
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CheckerConfig, Config, ConditionState, ConditionStatus, ExecutionMode, Job, JobConfig,
    LoggingConfig, Verdict,
};
pub use domain::ports::{MetricsSink, StreamsInstance, Submitter};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AdminService, CheckerOutcome, ConditionChecker, Tester};
