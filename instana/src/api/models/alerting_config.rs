use serde::{Deserialize, Serialize};

use crate::api::RestObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilteringConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingConfiguration {
    pub id: String,
    pub alert_name: String,
    #[serde(default)]
    pub integration_ids: Vec<String>,
    #[serde(default)]
    pub event_filtering_configuration: EventFilteringConfiguration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_payload_fields: Vec<CustomPayloadField>,
}

impl RestObject for AlertingConfiguration {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Extra field attached to alert notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CustomPayloadField {
    #[serde(rename = "staticString")]
    Static { key: String, value: String },
    #[serde(rename = "dynamic")]
    Dynamic {
        key: String,
        value: DynamicFieldValue,
    },
}

impl CustomPayloadField {
    pub fn key(&self) -> &str {
        match self {
            CustomPayloadField::Static { key, .. } | CustomPayloadField::Dynamic { key, .. } => key,
        }
    }
}

/// Value resolved from a tag of the alerting entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicFieldValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub tag_name: String,
}
