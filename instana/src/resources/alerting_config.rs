//! instana_alerting_config

use tfplug::plan_modifier::RequiresReplace;
use tfplug::validator::{OneOf, SizeBetween, StringLength};
use tfplug::{AttributeBuilder, SchemaBuilder, Value};

use super::id_attribute;
use crate::api::models::{AlertingConfiguration, EventFilteringConfiguration};
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{
    drop_attributes, required_string, MappingError, ResourceHandle, ResourceMetaData,
    StateUpgrader,
};

pub const RESOURCE_NAME: &str = "instana_alerting_config";

pub const ALERT_EVENT_TYPES: &[&str] = &[
    "incident",
    "critical",
    "warning",
    "change",
    "online",
    "offline",
    "none",
    "agent_monitoring_issue",
];

#[derive(Default)]
pub struct AlertingConfigResource;

impl ResourceHandle for AlertingConfigResource {
    type Object = AlertingConfiguration;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Routes events matching a filter to alerting channels")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("alert_name")
                    .required()
                    .validator(StringLength::between(1, 256))
                    .description("Name of the alerting configuration")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("integration_ids")
                    .required()
                    .validator(SizeBetween { min: 0, max: 1024 })
                    .description("Ids of the alerting channels to notify")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("event_filter_query")
                    .optional()
                    .validator(StringLength::between(0, 2048))
                    .description("Dynamic focus query restricting the events")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("event_filter_event_types")
                    .optional()
                    .validator(OneOf::new(ALERT_EVENT_TYPES.iter().copied()))
                    .plan_modifier(RequiresReplace)
                    .description("Event types to alert on")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("event_filter_rule_ids")
                    .optional()
                    .validator(SizeBetween { min: 0, max: 1024 })
                    .plan_modifier(RequiresReplace)
                    .description("Ids of the event rules to alert on")
                    .build(),
            )
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<AlertingConfiguration> {
        client.alerting_configurations()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<AlertingConfiguration, MappingError> {
        Ok(AlertingConfiguration {
            id: state.get_string("id").unwrap_or_default(),
            alert_name: required_string(state, "alert_name")?,
            integration_ids: state.get_string_list("integration_ids"),
            event_filtering_configuration: EventFilteringConfiguration {
                query: state.get_non_empty_string("event_filter_query"),
                rule_ids: state.get_string_list("event_filter_rule_ids"),
                event_types: state
                    .get_string_list("event_filter_event_types")
                    .into_iter()
                    .map(|t| t.to_lowercase())
                    .collect(),
            },
            custom_payload_fields: payload::fields_from_state(state)?,
        })
    }

    fn object_to_state(
        &self,
        _state: &Value,
        config: &AlertingConfiguration,
    ) -> Result<Value, MappingError> {
        let filter = &config.event_filtering_configuration;
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("alert_name", Value::from(config.alert_name.as_str())),
            ("integration_ids", Value::string_set(config.integration_ids.clone())),
            ("event_filter_query", Value::from(filter.query.clone())),
            (
                "event_filter_event_types",
                Value::string_set_or_null(
                    filter.event_types.iter().map(|t| t.to_lowercase()).collect(),
                ),
            ),
            (
                "event_filter_rule_ids",
                Value::string_set_or_null(filter.rule_ids.clone()),
            ),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
        ]))
    }

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        vec![StateUpgrader::new(0, |state| {
            Ok(drop_attributes(state, &["full_alert_name"]))
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_harmonized_to_lower_case() {
        let state = Value::object([
            ("alert_name", Value::from("prod")),
            ("integration_ids", Value::string_set(["c1"])),
            (
                "event_filter_event_types",
                Value::string_set(["CRITICAL", "warning"]),
            ),
        ]);
        let config = AlertingConfigResource.state_to_object(&state, &Value::Null).unwrap();
        assert_eq!(
            config.event_filtering_configuration.event_types,
            vec!["critical".to_string(), "warning".to_string()]
        );
        assert!(config.custom_payload_fields.is_empty());
    }

    #[test]
    fn empty_filters_read_back_as_null() {
        let config = AlertingConfiguration {
            id: "a1".to_string(),
            alert_name: "prod".to_string(),
            integration_ids: vec!["c1".to_string()],
            ..Default::default()
        };
        let state = AlertingConfigResource
            .object_to_state(&Value::Null, &config)
            .unwrap();
        assert!(state.get("event_filter_event_types").is_null());
        assert!(state.get("event_filter_rule_ids").is_null());
        assert!(state.get(payload::CUSTOM_PAYLOAD_FIELD).is_null());
        assert_eq!(AlertingConfigResource.state_to_object(&state, &Value::Null).unwrap(), config);
    }
}
