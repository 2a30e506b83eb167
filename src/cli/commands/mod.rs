//! CLI command implementations.

pub mod appconfig;
pub mod canceljob;
pub mod checkjob;
pub mod lsjobs;
pub mod submitjob;
