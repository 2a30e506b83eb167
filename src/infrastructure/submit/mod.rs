//! `Submitter` implementations
//!
//! - `ProcessSubmitter`: runs the application as a local process (standalone)
//! - `BundleSubmitter`: submits a bundle to a Streams instance (distributed)

pub mod bundle;
pub mod process;

pub use bundle::BundleSubmitter;
pub use process::ProcessSubmitter;
