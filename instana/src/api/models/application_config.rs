use serde::{Deserialize, Serialize};

use super::tag_filter::TagFilter;
use crate::api::RestObject;

pub const APPLICATION_CONFIG_SCOPES: &[&str] = &[
    "INCLUDE_NO_DOWNSTREAM",
    "INCLUDE_IMMEDIATE_DOWNSTREAM_DATABASE_AND_MESSAGING",
    "INCLUDE_ALL_DOWNSTREAM",
];

pub const BOUNDARY_SCOPES: &[&str] = &["ALL", "INBOUND", "DEFAULT"];

pub const ACCESS_TYPES: &[&str] = &["READ", "READ_WRITE"];

pub const RELATION_TYPES: &[&str] = &["USER", "API_TOKEN", "ROLE", "TEAM", "GLOBAL"];

/// Grants a user, token, role or team access to an application or dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    pub access_type: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    pub id: String,
    pub label: String,
    pub scope: String,
    pub boundary_scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub access_rules: Vec<AccessRule>,
}

impl RestObject for ApplicationConfig {
    fn id(&self) -> &str {
        &self.id
    }
}
