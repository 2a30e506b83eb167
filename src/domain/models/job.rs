//! Job domain model.
//!
//! A job is one running instantiation of a submitted application bundle.
//! Field names follow the Streams REST representation so a job can be
//! deserialized directly from the `jobs` resource.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A job running in a Streams instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub started_by: String,
    /// Submission time in milliseconds since the epoch.
    #[serde(default)]
    pub submit_time: i64,
    #[serde(default)]
    pub job_group: String,
    #[serde(default)]
    pub product_version: String,
    /// URL of the job's operators resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<String>,
}

impl Job {
    pub fn is_healthy(&self) -> bool {
        self.health == "healthy"
    }

    /// Last path segment of the job group, e.g. `default` for
    /// `/streams/jobgroups/default`.
    pub fn job_group_short(&self) -> &str {
        self.job_group.rsplit('/').next().unwrap_or_default()
    }

    /// Status with the first letter upper-cased (`running` -> `Running`).
    pub fn status_display(&self) -> String {
        let mut chars = self.status.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }
}

/// Selection criteria for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl JobFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.id.as_ref().is_none_or(|id| &job.id == id)
            && self.name.as_ref().is_none_or(|name| &job.name == name)
    }
}

/// Job configuration overlay submitted alongside an application bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobConfig {
    pub job_name: Option<String>,
    pub job_group: Option<String>,
    pub submission_parameters: BTreeMap<String, String>,
    /// Raw overlay document loaded from `--jobConfig`, if any.
    pub base_overlay: Option<serde_json::Value>,
}

impl JobConfig {
    /// Seed a job configuration from an overlay document of the form
    /// `{"jobConfigOverlays": [{"jobConfig": {...}}]}`.
    pub fn from_overlays(overlay: serde_json::Value) -> Self {
        let job_config = overlay
            .get("jobConfigOverlays")
            .and_then(|o| o.get(0))
            .and_then(|o| o.get("jobConfig"));

        let text = |key: &str| {
            job_config
                .and_then(|jc| jc.get(key))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };

        let submission_parameters = job_config
            .and_then(|jc| jc.get("submissionParameters"))
            .and_then(serde_json::Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|p| {
                        let name = p.get("name")?.as_str()?;
                        let value = match p.get("value")? {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        Some((name.to_string(), value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            job_name: text("jobName"),
            job_group: text("jobGroup"),
            submission_parameters,
            base_overlay: Some(overlay),
        }
    }

    /// Parse a `name=value` submission-time parameter and record it.
    pub fn add_submission_parameter(&mut self, param: &str) -> Result<(), String> {
        let (name, value) = split_name_value(param).ok_or_else(|| param.to_string())?;
        self.submission_parameters.insert(name, value);
        Ok(())
    }

    /// Render the overlay document sent to the `jobs` resource.
    ///
    /// Values set on this struct override those of the base overlay.
    pub fn as_overlay(&self) -> serde_json::Value {
        let mut overlay = self
            .base_overlay
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "jobConfigOverlays": [{}] }));

        let Some(first) = overlay
            .get_mut("jobConfigOverlays")
            .and_then(serde_json::Value::as_array_mut)
            .and_then(|arr| {
                if arr.is_empty() {
                    arr.push(serde_json::json!({}));
                }
                arr.first_mut()
            })
        else {
            return serde_json::json!({ "jobConfigOverlays": [{ "jobConfig": self.job_config_json() }] });
        };

        let job_config = first
            .as_object_mut()
            .map(|o| o.entry("jobConfig").or_insert_with(|| serde_json::json!({})));

        if let Some(serde_json::Value::Object(jc)) = job_config {
            if let serde_json::Value::Object(ours) = self.job_config_json() {
                for (k, v) in ours {
                    jc.insert(k, v);
                }
            }
        }

        overlay
    }

    fn job_config_json(&self) -> serde_json::Value {
        let mut jc = serde_json::Map::new();
        if let Some(name) = &self.job_name {
            jc.insert("jobName".to_string(), name.clone().into());
        }
        if let Some(group) = &self.job_group {
            jc.insert("jobGroup".to_string(), group.clone().into());
        }
        if !self.submission_parameters.is_empty() {
            let params: Vec<_> = self
                .submission_parameters
                .iter()
                .map(|(name, value)| serde_json::json!({ "name": name, "value": value }))
                .collect();
            jc.insert("submissionParameters".to_string(), params.into());
        }
        serde_json::Value::Object(jc)
    }
}

/// Split `name=value`; exactly one `=` is accepted.
pub fn split_name_value(pair: &str) -> Option<(String, String)> {
    let mut parts = pair.split('=');
    let name = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}
