//! instana_log_alert_config
//!
//! Log alerts count matching log lines. The single `rules` block carries
//! the metric together with its thresholds.

use tfplug::defaults::StaticDefault;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::alerts::{
    alert_channels_from_state, alert_channels_schema_block, alert_channels_to_state,
    description_attribute, grace_period_attribute, granularity_attribute, granularity_from_state,
    name_attribute, ALERT_CHANNELS, GRANULARITY, RULES,
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
use crate::api::models::alert_config::{AlertRule, GroupByTag, RuleWithThresholds};
use crate::api::models::LogAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_log_alert_config";

pub const GROUP_BY: &str = "group_by";
pub const LOG_COUNT_ALERT_TYPE: &str = "logCount";
pub const LOG_COUNT_AGGREGATION: &str = "SUM";

const TIME_THRESHOLD_KINDS: &[TimeThresholdKind] = &[TimeThresholdKind::ViolationsInSequence];

fn group_by_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("Tag the alert is split by")
        .attribute(
            AttributeBuilder::string("tag_name")
                .required()
                .description("Name of the tag")
                .build(),
        )
        .attribute(
            AttributeBuilder::string("key")
                .optional()
                .description("Key of the tag, for tags holding key/value pairs")
                .build(),
        )
        .build();
    NestedBlock::list(GROUP_BY, block)
}

fn rules_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("The log count condition with its thresholds")
        .attribute(
            AttributeBuilder::string("metric_name")
                .required()
                .description("Metric the rule evaluates")
                .build(),
        )
        .attribute(
            AttributeBuilder::string("alert_type")
                .optional()
                .computed()
                .default(StaticDefault::string(LOG_COUNT_ALERT_TYPE))
                .validator(OneOf::new([LOG_COUNT_ALERT_TYPE]))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("aggregation")
                .optional()
                .computed()
                .default(StaticDefault::string(LOG_COUNT_AGGREGATION))
                .validator(OneOf::new([LOG_COUNT_AGGREGATION]))
                .build(),
        )
        .attribute(threshold_operator_attribute())
        .block(threshold_schema_block())
        .build();
    NestedBlock::list(RULES, block).min_items(1).max_items(1)
}

fn group_by_from_state(root: &BlockReader) -> Result<Vec<GroupByTag>, MappingError> {
    root.children(GROUP_BY)
        .iter()
        .map(|tag| {
            Ok(GroupByTag {
                tag_name: tag.string("tag_name")?,
                key: tag.optional_string("key"),
            })
        })
        .collect()
}

fn group_by_to_state(tags: &[GroupByTag]) -> Value {
    if tags.is_empty() {
        return Value::Null;
    }
    Value::List(
        tags.iter()
            .map(|tag| {
                Value::object([
                    ("tag_name", Value::from(tag.tag_name.as_str())),
                    ("key", Value::from(tag.key.clone())),
                ])
            })
            .collect(),
    )
}

fn rules_from_state(root: &BlockReader) -> Result<Vec<RuleWithThresholds>, MappingError> {
    let Some(rules) = root.child(RULES) else {
        return Err(MappingError::parse(AttributePath::new(RULES), "rules must be set"));
    };
    Ok(vec![RuleWithThresholds {
        rule: AlertRule {
            alert_type: rules
                .optional_string("alert_type")
                .unwrap_or_else(|| LOG_COUNT_ALERT_TYPE.to_string()),
            metric_name: rules.string("metric_name")?,
            aggregation: rules
                .optional_string("aggregation")
                .or_else(|| Some(LOG_COUNT_AGGREGATION.to_string())),
            ..Default::default()
        },
        threshold_operator: rules.optional_string(THRESHOLD_OPERATOR),
        thresholds: thresholds_from_state(&rules)?,
    }])
}

fn rules_to_state(rules: &[RuleWithThresholds]) -> Result<Value, MappingError> {
    let Some(rule) = rules.first() else {
        return Ok(Value::Null);
    };
    if rule.rule.alert_type != LOG_COUNT_ALERT_TYPE {
        return Err(MappingError::unsupported(
            "log alert rule",
            rule.rule.alert_type.as_str(),
        ));
    }
    Ok(single_block([
        ("metric_name", Value::from(rule.rule.metric_name.as_str())),
        ("alert_type", Value::from(rule.rule.alert_type.as_str())),
        ("aggregation", Value::from(rule.rule.aggregation.clone())),
        (THRESHOLD_OPERATOR, Value::from(rule.threshold_operator.clone())),
        (THRESHOLD, thresholds_to_state(&rule.thresholds)),
    ]))
}

#[derive(Default)]
pub struct LogAlertConfigResource;

impl ResourceHandle for LogAlertConfigResource {
    type Object = LogAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Alert on the number of matching log lines")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute(false))
            .attribute(tag_filter_attribute("tag_filter", "Tag filter selecting the logs"))
            .attribute(granularity_attribute())
            .attribute(grace_period_attribute())
            .block(alert_channels_schema_block())
            .block(group_by_block())
            .block(rules_block())
            .block(time_threshold_schema_block(TIME_THRESHOLD_KINDS))
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<LogAlertConfig> {
        client.log_alert_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<LogAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        Ok(LogAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: state.get_string("description").unwrap_or_default(),
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            group_by: group_by_from_state(&root)?,
            alert_channels: alert_channels_from_state(state),
            granularity: granularity_from_state(state),
            grace_period: state.get_i64("grace_period"),
            time_threshold: time_threshold_from_state(&root, TIME_THRESHOLD_KINDS)?,
            custom_payload_fields: payload::fields_from_state(state)?,
            rules: rules_from_state(&root)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &LogAlertConfig,
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
            (GRANULARITY, Value::from(config.granularity)),
            ("grace_period", Value::from(config.grace_period)),
            (ALERT_CHANNELS, alert_channels_to_state(&config.alert_channels)),
            (GROUP_BY, group_by_to_state(&config.group_by)),
            (RULES, rules_to_state(&config.rules)?),
            (
                TIME_THRESHOLD,
                time_threshold_to_state(config.time_threshold.as_ref(), TIME_THRESHOLD_KINDS)?,
            ),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_logs_state() -> Value {
        Value::object([
            ("name", Value::from("error logs")),
            ("tag_filter", Value::from("log.level@na EQUALS 'ERROR'")),
            (
                GROUP_BY,
                Value::List(vec![Value::object([
                    ("tag_name", Value::from("k8s.namespace")),
                    ("key", Value::Null),
                ])]),
            ),
            (
                RULES,
                single_block([
                    ("metric_name", Value::from("log.count")),
                    ("threshold_operator", Value::from(">=")),
                    (
                        "threshold",
                        single_block([(
                            "warning",
                            Value::List(vec![Value::object([(
                                "static",
                                single_block([("value", Value::from(100.0))]),
                            )])]),
                        )]),
                    ),
                ]),
            ),
        ])
    }

    #[test]
    fn log_count_defaults_fill_the_rule() {
        let config = LogAlertConfigResource
            .state_to_object(&error_logs_state(), &Value::Null)
            .unwrap();
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(
            wire["rules"][0]["rule"],
            json!({"alertType": "logCount", "metricName": "log.count", "aggregation": "SUM"})
        );
        assert_eq!(wire["groupBy"], json!([{"tagName": "k8s.namespace"}]));
        assert_eq!(
            wire["rules"][0]["thresholds"],
            json!({"WARNING": {"type": "staticThreshold", "value": 100.0}})
        );
    }

    #[test]
    fn group_by_tags_read_back_in_order() {
        let mut config = LogAlertConfigResource
            .state_to_object(&error_logs_state(), &Value::Null)
            .unwrap();
        config.group_by.push(GroupByTag {
            tag_name: "host.label".to_string(),
            key: Some("zone".to_string()),
        });
        let state = LogAlertConfigResource
            .object_to_state(&error_logs_state(), &config)
            .unwrap();
        let tags = state.get_blocks(GROUP_BY);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1].get_string("key").as_deref(), Some("zone"));
        assert_eq!(
            state.get_string("tag_filter").as_deref(),
            Some("log.level@na EQUALS 'ERROR'")
        );
    }
}
