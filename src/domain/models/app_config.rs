//! Application configuration domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::job::split_name_value;

/// A named set of properties stored in the instance, used by applications to
/// connect to external systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfiguration {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    /// Creation time in milliseconds since the epoch.
    #[serde(default)]
    pub creation_time: i64,
    #[serde(default)]
    pub last_modified_time: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Fields sent when creating or changing an application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Merge `name=value` specifications into `props`.
///
/// Later entries win. Returns the first malformed specification as the error.
pub fn merge_properties<'a, I>(props: &mut BTreeMap<String, String>, specs: I) -> Result<(), String>
where
    I: IntoIterator<Item = &'a str>,
{
    for spec in specs {
        let (name, value) = split_name_value(spec).ok_or_else(|| spec.to_string())?;
        props.insert(name, value);
    }
    Ok(())
}
