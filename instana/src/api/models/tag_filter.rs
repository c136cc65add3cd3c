use serde::{Deserialize, Serialize};

pub const EXPRESSION_TYPE: &str = "EXPRESSION";
pub const TAG_FILTER_TYPE: &str = "TAG_FILTER";

/// Wire shape of a tag filter element; either a logical `EXPRESSION` holding
/// `elements` or a `TAG_FILTER` comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilter {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<TagFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_value: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl TagFilter {
    pub fn expression(logical_operator: &str, elements: Vec<TagFilter>) -> Self {
        Self {
            logical_operator: Some(logical_operator.to_string()),
            elements,
            ..Self::empty(EXPRESSION_TYPE)
        }
    }

    pub fn tag(name: &str, entity: &str, operator: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            entity: Some(entity.to_string()),
            operator: Some(operator.to_string()),
            ..Self::empty(TAG_FILTER_TYPE)
        }
    }

    fn empty(element_type: &str) -> Self {
        Self {
            element_type: element_type.to_string(),
            logical_operator: None,
            elements: Vec::new(),
            name: None,
            entity: None,
            operator: None,
            string_value: None,
            number_value: None,
            boolean_value: None,
            key: None,
            value: None,
        }
    }
}
