//! Infrastructure layer module
//!
//! Adapters and external integrations:
//! - Streams REST client and in-memory instance double
//! - In-memory metrics sink
//! - Local process and bundle submitters
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod streams;
pub mod submit;
