//! instana_mobile_alert_config

use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, SchemaBuilder, Value};

use super::alerts::{
    alert_channels_from_state, alert_channels_schema_block, alert_channels_to_state,
    description_attribute, grace_period_attribute, granularity_attribute, granularity_from_state,
    name_attribute, rule_fields_to_state, rule_from_fields, rules_from_state, rules_schema_block,
    rules_to_state, severity_attribute, severity_from_state, severity_to_state,
    triggering_attribute, with_rule_fields, RuleField, ALERT_CHANNELS, GRANULARITY, RULES,
};
use super::threshold::{
    time_threshold_from_state, time_threshold_schema_block, time_threshold_to_state,
    TimeThresholdKind, TIME_THRESHOLD,
};
use super::{
    id_attribute, string_attribute, tag_filter_attribute, tag_filter_from_state,
    tag_filter_to_state, BlockReader,
};
use crate::api::models::alert_config::AlertRule;
use crate::api::models::MobileAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_mobile_alert_config";

pub const CUSTOM_EVENT_ALERT_TYPE: &str = "customEvent";

const RULE_FIELDS: &[RuleField] = &[
    RuleField::MetricName,
    RuleField::Aggregation,
    RuleField::Operator,
    RuleField::Value,
    RuleField::CustomEventName,
];

const TIME_THRESHOLD_KINDS: &[TimeThresholdKind] = &[
    TimeThresholdKind::UserImpactOfViolationsInSequence,
    TimeThresholdKind::ViolationsInPeriod,
    TimeThresholdKind::ViolationsInSequence,
];

fn rule_from_state(reader: &BlockReader) -> Result<AlertRule, MappingError> {
    let rule = rule_from_fields(reader, reader.string("alert_type")?, RULE_FIELDS)?;
    if rule.alert_type == CUSTOM_EVENT_ALERT_TYPE && rule.custom_event_name.is_none() {
        return Err(MappingError::parse(
            reader.path.clone().attribute("custom_event_name"),
            "custom_event_name is required for customEvent rules",
        ));
    }
    Ok(rule)
}

fn rule_to_state(rule: &AlertRule) -> Result<Value, MappingError> {
    let mut state = Value::object(rule_fields_to_state(rule, RULE_FIELDS));
    state.set("alert_type", Value::from(rule.alert_type.as_str()));
    Ok(state)
}

#[derive(Default)]
pub struct MobileAlertConfigResource;

impl ResourceHandle for MobileAlertConfigResource {
    type Object = MobileAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let rule = with_rule_fields(
            BlockBuilder::new()
                .description("The metric condition of the alert")
                .attribute(
                    AttributeBuilder::string("alert_type")
                        .required()
                        .description("Kind of mobile app alert, e.g. crash or customEvent")
                        .build(),
                ),
            RULE_FIELDS,
        )
        .build();
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Alert on the beacons of a mobile app")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute(true))
            .attribute(string_attribute("mobile_app_id", "Id of the monitored mobile app"))
            .attribute(severity_attribute())
            .attribute(triggering_attribute())
            .attribute(tag_filter_attribute("tag_filter", "Tag filter limiting the beacons"))
            .attribute(granularity_attribute())
            .attribute(grace_period_attribute())
            .block(alert_channels_schema_block())
            .block(rules_schema_block(rule))
            .block(time_threshold_schema_block(TIME_THRESHOLD_KINDS))
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<MobileAlertConfig> {
        client.mobile_alert_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<MobileAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        Ok(MobileAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: required_string(state, "description")?,
            mobile_app_id: required_string(state, "mobile_app_id")?,
            severity: severity_from_state(state)?,
            triggering: state.get_bool("triggering").unwrap_or(false),
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            alert_channels: alert_channels_from_state(state),
            granularity: granularity_from_state(state),
            grace_period: state.get_i64("grace_period"),
            custom_payload_fields: payload::fields_from_state(state)?,
            rules: rules_from_state(&root, rule_from_state)?,
            time_threshold: time_threshold_from_state(&root, TIME_THRESHOLD_KINDS)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &MobileAlertConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            ("mobile_app_id", Value::from(config.mobile_app_id.as_str())),
            ("severity", severity_to_state(config.severity)?),
            ("triggering", Value::from(config.triggering)),
            (
                "tag_filter",
                tag_filter_to_state(
                    state.get("tag_filter"),
                    config.tag_filter_expression.as_ref(),
                )?,
            ),
            (ALERT_CHANNELS, alert_channels_to_state(&config.alert_channels)),
            (GRANULARITY, Value::from(config.granularity)),
            ("grace_period", Value::from(config.grace_period)),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
            (RULES, rules_to_state(&config.rules, rule_to_state)?),
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
    use crate::resources::single_block;

    fn custom_event_state(event_name: Value) -> Value {
        Value::object([
            ("name", Value::from("app crashes")),
            ("description", Value::from("custom crash event")),
            ("mobile_app_id", Value::from("m1")),
            (
                RULES,
                Value::List(vec![Value::object([(
                    "rule",
                    single_block([
                        ("alert_type", Value::from(CUSTOM_EVENT_ALERT_TYPE)),
                        ("metric_name", Value::from("customEvents")),
                        ("custom_event_name", event_name),
                    ]),
                )])]),
            ),
        ])
    }

    #[test]
    fn custom_event_rules_name_their_event() {
        let config = MobileAlertConfigResource
            .state_to_object(&custom_event_state(Value::from("checkout_failed")), &Value::Null)
            .unwrap();
        assert_eq!(config.rules[0].rule.alert_type, CUSTOM_EVENT_ALERT_TYPE);
        assert_eq!(
            config.rules[0].rule.custom_event_name.as_deref(),
            Some("checkout_failed")
        );

        let state = MobileAlertConfigResource
            .object_to_state(&Value::Null, &config)
            .unwrap();
        let rule = state.get_blocks(RULES)[0].get_block("rule").unwrap();
        assert_eq!(rule.get_string("alert_type").as_deref(), Some("customEvent"));
    }

    #[test]
    fn custom_event_rules_without_a_name_are_rejected() {
        let state = custom_event_state(Value::Null);
        match MobileAlertConfigResource.state_to_object(&state, &Value::Null) {
            Err(MappingError::ParseError { path, .. }) => assert_eq!(
                path,
                AttributePath::new(RULES)
                    .index(0)
                    .attribute("rule")
                    .index(0)
                    .attribute("custom_event_name")
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
