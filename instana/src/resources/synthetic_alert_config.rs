//! instana_synthetic_alert_config

use tfplug::defaults::StaticDefault;
use tfplug::validator::{IntBetween, OneOf};
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::alerts::{
    alert_channel_ids_attribute, description_attribute, grace_period_attribute, name_attribute,
    rule_fields_to_state, rule_from_fields, severity_attribute, severity_from_state,
    severity_to_state, with_rule_fields, RuleField, ALERT_CHANNEL_IDS, RULE,
};
use super::threshold::TIME_THRESHOLD;
use super::{
    id_attribute, single_block, tag_filter_attribute, tag_filter_from_state, tag_filter_to_state,
    BlockReader,
};
use crate::api::models::alert_config::TimeThreshold;
use crate::api::models::SyntheticAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_synthetic_alert_config";

pub const FAILURE_ALERT_TYPE: &str = "failure";
pub const VIOLATIONS_IN_SEQUENCE: &str = "violationsInSequence";

const RULE_FIELDS: &[RuleField] = &[RuleField::MetricName, RuleField::Aggregation];

fn rule_block() -> NestedBlock {
    let block = with_rule_fields(
        BlockBuilder::new()
            .description("The failure condition of the alert")
            .attribute(
                AttributeBuilder::string("alert_type")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(FAILURE_ALERT_TYPE))
                    .validator(OneOf::new([FAILURE_ALERT_TYPE]))
                    .build(),
            ),
        RULE_FIELDS,
    )
    .build();
    NestedBlock::list(RULE, block).min_items(1).max_items(1)
}

fn time_threshold_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("Consecutive failed runs before the alert opens")
        .attribute(
            AttributeBuilder::string("type")
                .optional()
                .computed()
                .default(StaticDefault::string(VIOLATIONS_IN_SEQUENCE))
                .validator(OneOf::new([VIOLATIONS_IN_SEQUENCE]))
                .build(),
        )
        .attribute(
            AttributeBuilder::int("violations_count")
                .required()
                .validator(IntBetween { min: 1, max: 12 })
                .build(),
        )
        .build();
    NestedBlock::list(TIME_THRESHOLD, block).min_items(1).max_items(1)
}

fn time_threshold_from_state(root: &BlockReader) -> Result<TimeThreshold, MappingError> {
    let block = root.child(TIME_THRESHOLD).ok_or_else(|| {
        MappingError::parse(AttributePath::new(TIME_THRESHOLD), "time_threshold must be set")
    })?;
    Ok(TimeThreshold::ViolationsInSequence {
        time_window: None,
        violations_count: Some(block.int("violations_count")?),
    })
}

fn time_threshold_to_state(threshold: &TimeThreshold) -> Result<Value, MappingError> {
    match threshold {
        TimeThreshold::ViolationsInSequence {
            violations_count, ..
        } => Ok(single_block([
            ("type", Value::from(VIOLATIONS_IN_SEQUENCE)),
            ("violations_count", Value::from(*violations_count)),
        ])),
        other => Err(MappingError::unsupported(
            "synthetic alert time threshold",
            format!("{:?}", other),
        )),
    }
}

#[derive(Default)]
pub struct SyntheticAlertConfigResource;

impl ResourceHandle for SyntheticAlertConfigResource {
    type Object = SyntheticAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Alert on failing synthetic test runs")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute(true))
            .attribute(
                AttributeBuilder::string_set("synthetic_test_ids")
                    .optional()
                    .description("Ids of the synthetic tests the alert watches")
                    .build(),
            )
            .attribute(severity_attribute())
            .attribute(tag_filter_attribute("tag_filter", "Tag filter limiting the test runs"))
            .attribute(alert_channel_ids_attribute())
            .attribute(grace_period_attribute())
            .block(rule_block())
            .block(time_threshold_block())
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<SyntheticAlertConfig> {
        client.synthetic_alert_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<SyntheticAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        let rule = root.child(RULE).ok_or_else(|| {
            MappingError::parse(AttributePath::new(RULE), "rule must be set")
        })?;
        let alert_type = rule
            .optional_string("alert_type")
            .unwrap_or_else(|| FAILURE_ALERT_TYPE.to_string());
        Ok(SyntheticAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: required_string(state, "description")?,
            synthetic_test_ids: state.get_string_list("synthetic_test_ids"),
            severity: severity_from_state(state)?,
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            rule: rule_from_fields(&rule, alert_type, RULE_FIELDS)?,
            alert_channel_ids: state.get_string_list(ALERT_CHANNEL_IDS),
            time_threshold: time_threshold_from_state(&root)?,
            grace_period: state.get_i64("grace_period"),
            custom_payload_fields: payload::fields_from_state(state)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &SyntheticAlertConfig,
    ) -> Result<Value, MappingError> {
        let mut rule = Value::object(rule_fields_to_state(&config.rule, RULE_FIELDS));
        rule.set("alert_type", Value::from(config.rule.alert_type.as_str()));
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            (
                "synthetic_test_ids",
                Value::string_set_or_null(config.synthetic_test_ids.clone()),
            ),
            ("severity", severity_to_state(config.severity)?),
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
            ("grace_period", Value::from(config.grace_period)),
            (RULE, Value::List(vec![rule])),
            (TIME_THRESHOLD, time_threshold_to_state(&config.time_threshold)?),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
        ]))
    }
}
