//! Wire envelopes of the Streams REST API.

use serde::{Deserialize, Serialize};

use crate::domain::models::{ApplicationConfiguration, Job};

#[derive(Debug, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
pub struct OperatorsResponse {
    #[serde(default)]
    pub operators: Vec<OperatorRef>,
}

/// An operator of a job, carrying the URL of its metrics resource.
#[derive(Debug, Deserialize)]
pub struct OperatorRef {
    pub name: String,
    #[serde(default)]
    pub metrics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub metrics: Vec<RawMetric>,
}

#[derive(Debug, Deserialize)]
pub struct RawMetric {
    pub name: String,
    /// Reported as an integer by the runtime; absent while the metric is
    /// still being registered.
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigsResponse {
    #[serde(default)]
    pub application_configurations: Vec<ApplicationConfiguration>,
}

#[derive(Debug, Deserialize)]
pub struct BundleResponse {
    #[serde(alias = "bundleId")]
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest<'a> {
    pub application: &'a str,
    pub job_configuration_overlay: serde_json::Value,
}
