//! Read-only objects used by data sources

use serde::{Deserialize, Serialize};

use crate::api::RestObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAgent {
    pub snapshot_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RestObject for HostAgent {
    fn id(&self) -> &str {
        &self.snapshot_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticLocation {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_type: String,
}

impl RestObject for SyntheticLocation {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logged_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfa_enabled: Option<bool>,
}

impl RestObject for User {
    fn id(&self) -> &str {
        &self.id
    }
}
