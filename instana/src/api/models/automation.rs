use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::RestObject;

pub const ACTION_TYPE_SCRIPT: &str = "SCRIPT";
pub const ACTION_TYPE_HTTP: &str = "HTTP";

pub const ENCODING_ASCII: &str = "ascii";
pub const ENCODING_BASE64: &str = "base64";

/// Named, encoded setting of an automation action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub encoding: String,
    pub value: String,
    #[serde(default)]
    pub secured: bool,
}

impl ActionField {
    pub fn ascii(name: &str, description: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            encoding: ENCODING_ASCII.to_string(),
            value: value.into(),
            secured: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInputParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub parameter_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub secured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationAction {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub fields: Vec<ActionField>,
    #[serde(default)]
    pub input_parameters: Vec<ActionInputParameter>,
}

impl AutomationAction {
    pub fn field(&self, name: &str) -> Option<&ActionField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl RestObject for AutomationAction {
    fn id(&self) -> &str {
        &self.id
    }
}

pub const TRIGGER_TYPES: &[&str] = &[
    "customEvent",
    "builtinEvent",
    "applicationSmartAlert",
    "globalApplicationSmartAlert",
    "websiteSmartAlert",
    "infraSmartAlert",
    "mobileAppSmartAlert",
    "syntheticsSmartAlert",
    "logSmartAlert",
    "sloSmartAlert",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    #[serde(rename = "type")]
    pub trigger_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub query: String,
}

/// Action embedded in a policy; everything beyond the id is carried verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyAction {
    pub id: String,
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParameterValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfiguration {
    pub action: PolicyAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub input_parameter_values: Vec<InputParameterValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    #[serde(default)]
    pub actions: Vec<ActionConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runnable {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub runnable_type: String,
    #[serde(default)]
    pub run_configuration: RunConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfiguration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub runnable: Runnable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub trigger: Trigger,
    #[serde(default)]
    pub type_configurations: Vec<TypeConfiguration>,
}

impl RestObject for AutomationPolicy {
    fn id(&self) -> &str {
        &self.id
    }
}
