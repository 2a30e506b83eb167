//! Streams REST API integration
//!
//! - HTTP client implementing the `StreamsInstance` port
//! - Error classification (transient vs permanent)
//! - Exponential backoff retry for reads
//! - In-memory instance double for tests

pub mod client;
pub mod errors;
pub mod mock_instance;
pub mod retry;
pub mod types;

pub use client::{Auth, StreamsClientConfig, StreamsRestClient};
pub use errors::StreamsApiError;
pub use mock_instance::MockStreamsInstance;
pub use retry::{RetryPolicy, Retryable};
