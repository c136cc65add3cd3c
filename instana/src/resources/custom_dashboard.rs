//! instana_custom_dashboard

use tfplug::validator::{JsonString, StringLength};
use tfplug::{AttributeBuilder, AttributePath, SchemaBuilder, Value};

use super::{
    access_rule_schema_block, access_rules_from_state, access_rules_to_state, id_attribute,
    ACCESS_RULE,
};
use crate::api::models::CustomDashboard;
use crate::api::{Client, RestResource};
use crate::json;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_custom_dashboard";

#[derive(Default)]
pub struct CustomDashboardResource;

/// Text recorded for the returned widgets; the prior text is kept while it
/// denotes the same document
fn widgets_to_state(prior: Option<String>, widgets: &serde_json::Value) -> Value {
    let canonical = json::canonical_string(widgets);
    match prior {
        Some(text) if json::canonicalize(&text).is_ok_and(|c| c == canonical) => Value::from(text),
        _ => Value::from(canonical),
    }
}

impl ResourceHandle for CustomDashboardResource {
    type Object = CustomDashboard;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("Custom dashboard with its widgets and access rules")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("title")
                    .required()
                    .validator(StringLength::between(1, 256))
                    .description("Title of the dashboard")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("widgets")
                    .required()
                    .validator(JsonString)
                    .description("JSON array of the widget definitions")
                    .build(),
            )
            .block(access_rule_schema_block().min_items(1))
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<CustomDashboard> {
        client.custom_dashboards()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<CustomDashboard, MappingError> {
        let text = required_string(state, "widgets")?;
        let widgets = serde_json::from_str(&text).map_err(|e| {
            MappingError::parse(
                AttributePath::new("widgets"),
                format!("widgets must be valid JSON: {}", e),
            )
        })?;
        Ok(CustomDashboard {
            id: state.get_string("id").unwrap_or_default(),
            title: required_string(state, "title")?,
            access_rules: access_rules_from_state(state)?,
            widgets,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        dashboard: &CustomDashboard,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(dashboard.id.as_str())),
            ("title", Value::from(dashboard.title.as_str())),
            (
                "widgets",
                widgets_to_state(state.get_string("widgets"), &dashboard.widgets),
            ),
            (ACCESS_RULE, access_rules_to_state(&dashboard.access_rules)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::single_block;
    use serde_json::json;

    fn state(widgets: &str) -> Value {
        Value::object([
            ("title", Value::from("ops")),
            ("widgets", Value::from(widgets)),
            (
                ACCESS_RULE,
                single_block([
                    ("access_type", Value::from("READ")),
                    ("relation_type", Value::from("GLOBAL")),
                    ("related_id", Value::Null),
                ]),
            ),
        ])
    }

    #[test]
    fn equivalent_widget_text_is_kept() {
        let input = state("[ {\"type\": \"chart\", \"id\": \"w1\"} ]");
        let dashboard = CustomDashboardResource.state_to_object(&input, &Value::Null).unwrap();
        assert_eq!(dashboard.widgets, json!([{"id": "w1", "type": "chart"}]));

        let back = CustomDashboardResource
            .object_to_state(&input, &dashboard)
            .unwrap();
        assert_eq!(back.get("widgets"), input.get("widgets"));
    }

    #[test]
    fn imported_widgets_are_canonical() {
        let dashboard = CustomDashboard {
            id: "d1".to_string(),
            title: "ops".to_string(),
            access_rules: Vec::new(),
            widgets: json!([{"type": "chart", "id": "w1"}]),
        };
        let state = CustomDashboardResource
            .object_to_state(&Value::Null, &dashboard)
            .unwrap();
        assert_eq!(
            state.get_string("widgets").as_deref(),
            Some(r#"[{"id":"w1","type":"chart"}]"#)
        );
        assert!(state.get(ACCESS_RULE).is_null());
    }

    #[test]
    fn changed_widgets_replace_the_prior_text() {
        let input = state(r#"[{"id":"w1"}]"#);
        let dashboard = CustomDashboard {
            widgets: json!([{"id": "w2"}]),
            ..CustomDashboardResource.state_to_object(&input, &Value::Null).unwrap()
        };
        let back = CustomDashboardResource
            .object_to_state(&input, &dashboard)
            .unwrap();
        assert_eq!(back.get_string("widgets").as_deref(), Some(r#"[{"id":"w2"}]"#));
    }

    #[test]
    fn malformed_widgets_are_a_parse_error() {
        assert!(matches!(
            CustomDashboardResource.state_to_object(&state("[{"), &Value::Null),
            Err(MappingError::ParseError { .. })
        ));
    }
}
