//! instana_website_alert_config

use tfplug::{AttributePath, SchemaBuilder, Value};

use super::alerts::{
    alert_channel_ids_attribute, description_attribute, granularity_attribute,
    granularity_from_state, name_attribute, rule_from_shapes, rule_shapes_block, rule_to_shapes,
    rules_from_state, rules_schema_block, rules_to_state, severity_attribute, severity_from_state,
    severity_to_state, triggering_attribute, RuleField, RuleShape, ALERT_CHANNEL_IDS, GRANULARITY,
    RULES,
};
use super::threshold::{
    time_threshold_from_state, time_threshold_schema_block, time_threshold_to_state,
    TimeThresholdKind, TIME_THRESHOLD,
};
use super::{
    id_attribute, string_attribute, tag_filter_attribute, tag_filter_from_state,
    tag_filter_to_state, BlockReader,
};
use crate::api::models::WebsiteAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_website_alert_config";

const COMPARED: &[RuleField] = &[
    RuleField::MetricName,
    RuleField::Aggregation,
    RuleField::Operator,
    RuleField::Value,
];

pub const RULE_SHAPES: &[RuleShape] = &[
    RuleShape {
        name: "slowness",
        alert_type: "slowness",
        fields: &[RuleField::MetricName, RuleField::Aggregation],
    },
    RuleShape {
        name: "specific_js_error",
        alert_type: "specificJsError",
        fields: COMPARED,
    },
    RuleShape {
        name: "status_code",
        alert_type: "statusCode",
        fields: COMPARED,
    },
    RuleShape {
        name: "throughput",
        alert_type: "throughput",
        fields: COMPARED,
    },
];

const TIME_THRESHOLD_KINDS: &[TimeThresholdKind] = &[
    TimeThresholdKind::UserImpactOfViolationsInSequence,
    TimeThresholdKind::ViolationsInPeriod,
    TimeThresholdKind::ViolationsInSequence,
];

#[derive(Default)]
pub struct WebsiteAlertConfigResource;

impl ResourceHandle for WebsiteAlertConfigResource {
    type Object = WebsiteAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Alert on the beacons of a website")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute(true))
            .attribute(string_attribute("website_id", "Id of the monitored website"))
            .attribute(severity_attribute())
            .attribute(triggering_attribute())
            .attribute(tag_filter_attribute("tag_filter", "Tag filter limiting the beacons"))
            .attribute(alert_channel_ids_attribute())
            .attribute(granularity_attribute())
            .block(rules_schema_block(rule_shapes_block(RULE_SHAPES)))
            .block(time_threshold_schema_block(TIME_THRESHOLD_KINDS))
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<WebsiteAlertConfig> {
        client.website_alert_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<WebsiteAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        Ok(WebsiteAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: required_string(state, "description")?,
            website_id: required_string(state, "website_id")?,
            severity: severity_from_state(state)?,
            triggering: state.get_bool("triggering").unwrap_or(false),
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            alert_channel_ids: state.get_string_list(ALERT_CHANNEL_IDS),
            granularity: granularity_from_state(state),
            custom_payload_fields: payload::fields_from_state(state)?,
            rules: rules_from_state(&root, |rule| rule_from_shapes(rule, RULE_SHAPES))?,
            time_threshold: time_threshold_from_state(&root, TIME_THRESHOLD_KINDS)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &WebsiteAlertConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            ("website_id", Value::from(config.website_id.as_str())),
            ("severity", severity_to_state(config.severity)?),
            ("triggering", Value::from(config.triggering)),
            (
                "tag_filter",
                tag_filter_to_state(
                    state.get("tag_filter"),
                    config.tag_filter_expression.as_ref(),
                )?,
            ),
            (
                ALERT_CHANNEL_IDS,
                Value::string_set_or_null(config.alert_channel_ids.clone()),
            ),
            (GRANULARITY, Value::from(config.granularity)),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
            (
                RULES,
                rules_to_state(&config.rules, |rule| rule_to_shapes(rule, RULE_SHAPES))?,
            ),
            (
                TIME_THRESHOLD,
                time_threshold_to_state(config.time_threshold.as_ref(), TIME_THRESHOLD_KINDS)?,
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::alert_config::{AlertRule, RuleWithThresholds, TimeThreshold};
    use serde_json::json;

    fn js_error_alert() -> WebsiteAlertConfig {
        WebsiteAlertConfig {
            id: "w1".to_string(),
            name: "shop js".to_string(),
            description: "script errors".to_string(),
            website_id: "site-1".to_string(),
            granularity: 300000,
            rules: vec![RuleWithThresholds {
                rule: AlertRule {
                    alert_type: "specificJsError".to_string(),
                    metric_name: "errors".to_string(),
                    operator: Some("CONTAINS".to_string()),
                    value: Some("undefined".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }],
            time_threshold: Some(TimeThreshold::UserImpactOfViolationsInSequence {
                time_window: 600000,
                impact_measurement_method: Some("AGGREGATED".to_string()),
                users: Some(5),
                user_percentage: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn js_error_rules_keep_their_comparison() {
        let handle = WebsiteAlertConfigResource;
        let state = handle.object_to_state(&Value::Null, &js_error_alert()).unwrap();
        let rule = state.get_blocks(RULES)[0]
            .get_block("rule")
            .and_then(|rule| rule.get_block("specific_js_error"))
            .unwrap();
        assert_eq!(rule.get_string("operator").as_deref(), Some("CONTAINS"));
        assert_eq!(rule.get_string("value").as_deref(), Some("undefined"));
        assert!(state.get("tag_filter").is_null());

        let back = handle.state_to_object(&state, &Value::Null).unwrap();
        assert_eq!(back, js_error_alert());
    }

    #[test]
    fn user_impact_is_sent_with_its_measurement_method() {
        let wire = serde_json::to_value(js_error_alert()).unwrap();
        assert_eq!(
            wire["timeThreshold"],
            json!({
                "type": "userImpactOfViolationsInSequence",
                "timeWindow": 600000,
                "impactMeasurementMethod": "AGGREGATED",
                "users": 5
            })
        );
    }
}
