//! instana_infra_alert_config
//!
//! Infrastructure alerts carry a single `generic_rule` holding its own
//! threshold operator and thresholds.

use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::alerts::{
    alert_channels_from_state, alert_channels_schema_block, alert_channels_to_state,
    description_attribute, granularity_attribute, granularity_from_state, name_attribute,
    rule_fields_to_state, rule_from_fields, with_rule_fields, RuleField, ALERT_CHANNELS,
    GRANULARITY, RULES,
};
use super::threshold::{
    threshold_operator_attribute, threshold_schema_block, thresholds_from_state,
    thresholds_to_state, time_threshold_from_state, time_threshold_schema_block,
    time_threshold_to_state, TimeThresholdKind, THRESHOLD, THRESHOLD_OPERATOR, TIME_THRESHOLD,
};
use super::{
    id_attribute, single_block, tag_filter_attribute, tag_filter_from_state, tag_filter_to_state,
    BlockReader,
};
use crate::api::models::alert_config::RuleWithThresholds;
use crate::api::models::InfraAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_infra_alert_config";

pub const GENERIC_RULE: &str = "generic_rule";
pub const GENERIC_RULE_ALERT_TYPE: &str = "genericRule";
pub const EVALUATION_TYPES: &[&str] = &["PER_ENTITY", "CUSTOM"];

const GENERIC_RULE_FIELDS: &[RuleField] = &[
    RuleField::MetricName,
    RuleField::EntityType,
    RuleField::Aggregation,
    RuleField::CrossSeriesAggregation,
    RuleField::Regex,
];

const TIME_THRESHOLD_KINDS: &[TimeThresholdKind] = &[TimeThresholdKind::ViolationsInSequence];

fn rules_block() -> NestedBlock {
    let generic = with_rule_fields(BlockBuilder::new(), GENERIC_RULE_FIELDS)
        .description("Threshold on an infrastructure metric")
        .attribute(threshold_operator_attribute())
        .block(threshold_schema_block())
        .build();
    let rules = BlockBuilder::new()
        .block(
            NestedBlock::list(GENERIC_RULE, generic)
                .min_items(1)
                .max_items(1),
        )
        .build();
    NestedBlock::list(RULES, rules).min_items(1).max_items(1)
}

fn rules_from_state(root: &BlockReader) -> Result<Vec<RuleWithThresholds>, MappingError> {
    let Some(generic) = root.child(RULES).and_then(|rules| rules.child(GENERIC_RULE)) else {
        return Err(MappingError::parse(
            AttributePath::new(RULES),
            "a generic_rule must be configured",
        ));
    };
    Ok(vec![RuleWithThresholds {
        rule: rule_from_fields(
            &generic,
            GENERIC_RULE_ALERT_TYPE.to_string(),
            GENERIC_RULE_FIELDS,
        )?,
        threshold_operator: generic.optional_string(THRESHOLD_OPERATOR),
        thresholds: thresholds_from_state(&generic)?,
    }])
}

fn rules_to_state(rules: &[RuleWithThresholds]) -> Result<Value, MappingError> {
    let Some(rule) = rules.first() else {
        return Ok(Value::Null);
    };
    if rule.rule.alert_type != GENERIC_RULE_ALERT_TYPE {
        return Err(MappingError::unsupported(
            "infrastructure alert rule",
            rule.rule.alert_type.as_str(),
        ));
    }
    let mut generic = Value::object(rule_fields_to_state(&rule.rule, GENERIC_RULE_FIELDS));
    generic.set(THRESHOLD_OPERATOR, Value::from(rule.threshold_operator.clone()));
    generic.set(THRESHOLD, thresholds_to_state(&rule.thresholds));
    Ok(single_block([(GENERIC_RULE, Value::List(vec![generic]))]))
}

#[derive(Default)]
pub struct InfraAlertConfigResource;

impl ResourceHandle for InfraAlertConfigResource {
    type Object = InfraAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Alert on infrastructure metrics")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute(false))
            .attribute(tag_filter_attribute("tag_filter", "Tag filter limiting the entities"))
            .attribute(
                AttributeBuilder::string_list("group_by")
                    .optional()
                    .description("Tags the alert is split by")
                    .build(),
            )
            .attribute(granularity_attribute())
            .attribute(
                AttributeBuilder::string("evaluation_type")
                    .required()
                    .validator(OneOf::new(EVALUATION_TYPES.iter().copied()))
                    .description("Whether entities are evaluated one by one or grouped")
                    .build(),
            )
            .block(alert_channels_schema_block())
            .block(time_threshold_schema_block(TIME_THRESHOLD_KINDS))
            .block(rules_block())
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<InfraAlertConfig> {
        client.infra_alert_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<InfraAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        Ok(InfraAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: state.get_string("description").unwrap_or_default(),
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            group_by: state.get_string_list("group_by"),
            alert_channels: alert_channels_from_state(state),
            granularity: granularity_from_state(state),
            time_threshold: time_threshold_from_state(&root, TIME_THRESHOLD_KINDS)?,
            custom_payload_fields: payload::fields_from_state(state)?,
            rules: rules_from_state(&root)?,
            evaluation_type: required_string(state, "evaluation_type")?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &InfraAlertConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            (
                "tag_filter",
                tag_filter_to_state(
                    state.get("tag_filter"),
                    config.tag_filter_expression.as_ref(),
                )?,
            ),
            ("group_by", Value::string_list_or_null(config.group_by.clone())),
            (ALERT_CHANNELS, alert_channels_to_state(&config.alert_channels)),
            (GRANULARITY, Value::from(config.granularity)),
            (
                TIME_THRESHOLD,
                time_threshold_to_state(config.time_threshold.as_ref(), TIME_THRESHOLD_KINDS)?,
            ),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
            (RULES, rules_to_state(&config.rules)?),
            ("evaluation_type", Value::from(config.evaluation_type.as_str())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generic_rule_state() -> Value {
        Value::object([
            ("name", Value::from("cpu")),
            ("evaluation_type", Value::from("PER_ENTITY")),
            (
                RULES,
                single_block([(
                    GENERIC_RULE,
                    single_block([
                        ("metric_name", Value::from("cpu.used")),
                        ("entity_type", Value::from("host")),
                        ("aggregation", Value::from("MAX")),
                        ("cross_series_aggregation", Value::from("MEAN")),
                        ("regex", Value::from(false)),
                        ("threshold_operator", Value::from(">")),
                        (
                            "threshold",
                            single_block([(
                                "critical",
                                Value::List(vec![Value::object([(
                                    "static",
                                    single_block([("value", Value::from(90.0))]),
                                )])]),
                            )]),
                        ),
                    ]),
                )]),
            ),
        ])
    }

    #[test]
    fn generic_rule_is_sent_as_a_rule_with_thresholds() {
        let config = InfraAlertConfigResource
            .state_to_object(&generic_rule_state(), &Value::Null)
            .unwrap();
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(
            wire["rules"],
            json!([{
                "rule": {
                    "alertType": "genericRule",
                    "metricName": "cpu.used",
                    "entityType": "host",
                    "aggregation": "MAX",
                    "crossSeriesAggregation": "MEAN",
                    "regex": false
                },
                "thresholdOperator": ">",
                "thresholds": {"CRITICAL": {"type": "staticThreshold", "value": 90.0}}
            }])
        );
        assert_eq!(wire["granularity"], json!(600000));
        assert_eq!(wire["description"], json!(""));
    }

    #[test]
    fn missing_generic_rule_is_rejected() {
        let mut state = generic_rule_state();
        state.set(RULES, Value::Null);
        assert!(matches!(
            InfraAlertConfigResource.state_to_object(&state, &Value::Null),
            Err(MappingError::ParseError { .. })
        ));
    }

    #[test]
    fn foreign_rule_types_are_unsupported() {
        let mut config = InfraAlertConfigResource
            .state_to_object(&generic_rule_state(), &Value::Null)
            .unwrap();
        config.rules[0].rule.alert_type = "hostAvailability".to_string();
        assert!(matches!(
            InfraAlertConfigResource.object_to_state(&Value::Null, &config),
            Err(MappingError::UnsupportedVariant { .. })
        ));
    }
}
