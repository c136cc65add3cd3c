//! Building blocks shared by the alert config resources
//!
//! Rules are described by [`RuleShape`] tables: the block name in state, the
//! `alertType` on the wire and the [`RuleField`]s the kind carries. Schema and
//! both mapping directions are derived from those tables.

use tfplug::defaults::StaticDefault;
use tfplug::schema::{Attribute, Block};
use tfplug::validator::{IntOneOf, OneOf, StringLength};
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, Value};

use super::threshold::{
    threshold_operator_attribute, threshold_schema_block, thresholds_from_state,
    thresholds_to_state, THRESHOLD, THRESHOLD_OPERATOR,
};
use super::BlockReader;
use crate::api::models::alert_config::{
    AlertChannels, AlertRule, RuleWithThresholds, SEVERITY_KEY_CRITICAL, SEVERITY_KEY_WARNING,
};
use crate::api::models::event_specification::{severity_code, severity_name};
use crate::resourcehandle::MappingError;

pub const GRANULARITY: &str = "granularity";
pub const GRANULARITIES: &[i64] = &[60000, 300000, 600000, 900000, 1200000, 1800000];
pub const DEFAULT_GRANULARITY: i64 = 600000;

pub const AGGREGATIONS: &[&str] = &[
    "SUM",
    "MEAN",
    "MAX",
    "MIN",
    "P25",
    "P50",
    "P75",
    "P90",
    "P95",
    "P98",
    "P99",
    "P99_9",
    "P99_99",
    "DISTINCT_COUNT",
    "SUM_POSITIVE",
    "PER_SECOND",
    "INCREASE",
];
pub const LOG_LEVELS: &[&str] = &["WARN", "ERROR", "ANY"];
pub const SEVERITIES: &[&str] = &["warning", "critical"];

pub const RULES: &str = "rules";
pub const RULE: &str = "rule";
pub const ALERT_CHANNELS: &str = "alert_channels";
pub const ALERT_CHANNEL_IDS: &str = "alert_channel_ids";

const CHANNEL_SEVERITIES: [(&str, &str); 2] = [
    ("warning", SEVERITY_KEY_WARNING),
    ("critical", SEVERITY_KEY_CRITICAL),
];

/// Attribute of a rule block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    MetricName,
    Aggregation,
    CrossSeriesAggregation,
    EntityType,
    Regex,
    Operator,
    Value,
    Level,
    Message,
    StatusCodeStart,
    StatusCodeEnd,
    CustomEventName,
}

impl RuleField {
    pub fn name(self) -> &'static str {
        match self {
            RuleField::MetricName => "metric_name",
            RuleField::Aggregation => "aggregation",
            RuleField::CrossSeriesAggregation => "cross_series_aggregation",
            RuleField::EntityType => "entity_type",
            RuleField::Regex => "regex",
            RuleField::Operator => "operator",
            RuleField::Value => "value",
            RuleField::Level => "level",
            RuleField::Message => "message",
            RuleField::StatusCodeStart => "status_code_start",
            RuleField::StatusCodeEnd => "status_code_end",
            RuleField::CustomEventName => "custom_event_name",
        }
    }

    fn attribute(self) -> Attribute {
        let name = self.name();
        match self {
            RuleField::MetricName | RuleField::EntityType => {
                AttributeBuilder::string(name).required().build()
            }
            RuleField::Aggregation | RuleField::CrossSeriesAggregation => {
                AttributeBuilder::string(name)
                    .optional()
                    .validator(OneOf::new(AGGREGATIONS.iter().copied()))
                    .build()
            }
            RuleField::Regex => AttributeBuilder::bool(name).optional().build(),
            RuleField::Level => AttributeBuilder::string(name)
                .optional()
                .validator(OneOf::new(LOG_LEVELS.iter().copied()))
                .build(),
            RuleField::StatusCodeStart | RuleField::StatusCodeEnd => {
                AttributeBuilder::int(name).optional().build()
            }
            RuleField::Operator
            | RuleField::Value
            | RuleField::Message
            | RuleField::CustomEventName => AttributeBuilder::string(name).optional().build(),
        }
    }

    fn read(self, reader: &BlockReader, rule: &mut AlertRule) -> Result<(), MappingError> {
        let name = self.name();
        let text = || reader.optional_string(name);
        match self {
            RuleField::MetricName => rule.metric_name = reader.string(name)?,
            RuleField::EntityType => rule.entity_type = Some(reader.string(name)?),
            RuleField::Aggregation => rule.aggregation = text(),
            RuleField::CrossSeriesAggregation => rule.cross_series_aggregation = text(),
            RuleField::Regex => rule.regex = reader.block.get_bool(name),
            RuleField::Operator => rule.operator = text(),
            RuleField::Value => rule.value = text(),
            RuleField::Level => rule.level = text(),
            RuleField::Message => rule.message = text(),
            RuleField::StatusCodeStart => rule.status_code_start = reader.block.get_i64(name),
            RuleField::StatusCodeEnd => rule.status_code_end = reader.block.get_i64(name),
            RuleField::CustomEventName => rule.custom_event_name = text(),
        }
        Ok(())
    }

    fn write(self, rule: &AlertRule) -> Value {
        let text = |v: &Option<String>| Value::from(v.clone());
        match self {
            RuleField::MetricName => Value::from(rule.metric_name.as_str()),
            RuleField::EntityType => text(&rule.entity_type),
            RuleField::Aggregation => text(&rule.aggregation),
            RuleField::CrossSeriesAggregation => text(&rule.cross_series_aggregation),
            RuleField::Regex => Value::from(rule.regex),
            RuleField::Operator => text(&rule.operator),
            RuleField::Value => text(&rule.value),
            RuleField::Level => text(&rule.level),
            RuleField::Message => text(&rule.message),
            RuleField::StatusCodeStart => Value::from(rule.status_code_start),
            RuleField::StatusCodeEnd => Value::from(rule.status_code_end),
            RuleField::CustomEventName => text(&rule.custom_event_name),
        }
    }
}

/// One rule kind of an alert config
#[derive(Debug, Clone, Copy)]
pub struct RuleShape {
    /// Block name in state
    pub name: &'static str,
    /// `alertType` on the wire
    pub alert_type: &'static str,
    pub fields: &'static [RuleField],
}

pub(crate) fn with_rule_fields(builder: BlockBuilder, fields: &[RuleField]) -> BlockBuilder {
    fields
        .iter()
        .fold(builder, |builder, field| builder.attribute(field.attribute()))
}

/// Block offering one nested block per shape, exactly one of them set
pub(crate) fn rule_shapes_block(shapes: &[RuleShape]) -> Block {
    let names: Vec<&str> = shapes.iter().map(|shape| shape.name).collect();
    shapes
        .iter()
        .fold(
            BlockBuilder::new().description("The metric condition of the alert"),
            |builder, shape| {
                let block = with_rule_fields(BlockBuilder::new(), shape.fields).build();
                builder.block(NestedBlock::list(shape.name, block).max_items(1))
            },
        )
        .exactly_one_of(&names)
        .build()
}

/// Rule of `alert_type` from the `fields` of `reader`
pub(crate) fn rule_from_fields(
    reader: &BlockReader,
    alert_type: String,
    fields: &[RuleField],
) -> Result<AlertRule, MappingError> {
    let mut rule = AlertRule {
        alert_type,
        ..Default::default()
    };
    for field in fields {
        field.read(reader, &mut rule)?;
    }
    Ok(rule)
}

pub(crate) fn rule_fields_to_state(
    rule: &AlertRule,
    fields: &[RuleField],
) -> Vec<(&'static str, Value)> {
    fields
        .iter()
        .map(|field| (field.name(), field.write(rule)))
        .collect()
}

/// Rule of the shape configured under `reader`
pub(crate) fn rule_from_shapes(
    reader: &BlockReader,
    shapes: &[RuleShape],
) -> Result<AlertRule, MappingError> {
    for shape in shapes {
        if let Some(fields) = reader.child(shape.name) {
            return rule_from_fields(&fields, shape.alert_type.to_string(), shape.fields);
        }
    }
    let names: Vec<&str> = shapes.iter().map(|shape| shape.name).collect();
    Err(MappingError::parse(
        reader.path.clone(),
        format!("one of {} must be set", names.join(", ")),
    ))
}

pub(crate) fn rule_to_shapes(
    rule: &AlertRule,
    shapes: &[RuleShape],
) -> Result<Value, MappingError> {
    let shape = shapes
        .iter()
        .find(|shape| shape.alert_type == rule.alert_type)
        .ok_or_else(|| MappingError::unsupported("alert rule type", rule.alert_type.as_str()))?;
    Ok(Value::object(shapes.iter().map(|candidate| {
        let value = if candidate.name == shape.name {
            Value::List(vec![Value::object(rule_fields_to_state(rule, shape.fields))])
        } else {
            Value::Null
        };
        (candidate.name, value)
    })))
}

/// `rules` list whose elements hold a `rule` block plus thresholds
pub(crate) fn rules_schema_block(rule: Block) -> NestedBlock {
    let block = BlockBuilder::new()
        .description("Rules with their thresholds")
        .block(NestedBlock::list(RULE, rule).min_items(1).max_items(1))
        .attribute(threshold_operator_attribute())
        .block(threshold_schema_block())
        .build();
    NestedBlock::list(RULES, block).min_items(1)
}

/// Wire rules of the `rules` list; `read_rule` maps each `rule` block
pub(crate) fn rules_from_state<F>(
    state: &BlockReader,
    read_rule: F,
) -> Result<Vec<RuleWithThresholds>, MappingError>
where
    F: Fn(&BlockReader) -> Result<AlertRule, MappingError>,
{
    state
        .children(RULES)
        .iter()
        .map(|element| {
            let rule = element.child(RULE).ok_or_else(|| {
                MappingError::parse(element.path.clone().attribute(RULE), "rule must be set")
            })?;
            Ok(RuleWithThresholds {
                rule: read_rule(&rule)?,
                threshold_operator: element.optional_string(THRESHOLD_OPERATOR),
                thresholds: thresholds_from_state(element)?,
            })
        })
        .collect()
}

pub(crate) fn rules_to_state<F>(
    rules: &[RuleWithThresholds],
    write_rule: F,
) -> Result<Value, MappingError>
where
    F: Fn(&AlertRule) -> Result<Value, MappingError>,
{
    if rules.is_empty() {
        return Ok(Value::Null);
    }
    let elements = rules
        .iter()
        .map(|rule| {
            Ok(Value::object([
                (RULE, Value::List(vec![write_rule(&rule.rule)?])),
                (THRESHOLD_OPERATOR, Value::from(rule.threshold_operator.clone())),
                (THRESHOLD, thresholds_to_state(&rule.thresholds)),
            ]))
        })
        .collect::<Result<Vec<_>, MappingError>>()?;
    Ok(Value::List(elements))
}

pub(crate) fn granularity_attribute() -> Attribute {
    AttributeBuilder::int(GRANULARITY)
        .optional()
        .computed()
        .default(StaticDefault::int(DEFAULT_GRANULARITY))
        .validator(IntOneOf::new(GRANULARITIES))
        .description("Evaluation granularity in milliseconds")
        .build()
}

pub(crate) fn granularity_from_state(state: &Value) -> i64 {
    state.get_i64(GRANULARITY).unwrap_or(DEFAULT_GRANULARITY)
}

pub(crate) fn name_attribute() -> Attribute {
    AttributeBuilder::string("name")
        .required()
        .validator(StringLength::between(1, 256))
        .description("Name of the alert configuration")
        .build()
}

/// Description; optional descriptions read back as empty strings
pub(crate) fn description_attribute(required: bool) -> Attribute {
    let builder = AttributeBuilder::string("description")
        .validator(StringLength::between(0, 65536))
        .description("Description of the alert configuration");
    if required {
        builder.required().build()
    } else {
        builder
            .optional()
            .computed()
            .default(StaticDefault::string(""))
            .build()
    }
}

pub(crate) fn severity_attribute() -> Attribute {
    AttributeBuilder::string("severity")
        .optional()
        .validator(OneOf::new(SEVERITIES.iter().copied()))
        .description("Severity of the alert, warning or critical")
        .build()
}

pub(crate) fn severity_from_state(state: &Value) -> Result<Option<i32>, MappingError> {
    match state.get_non_empty_string("severity") {
        None => Ok(None),
        Some(name) => severity_code(&name).map(Some).ok_or_else(|| {
            MappingError::parse(
                AttributePath::new("severity"),
                format!("unknown severity '{}'", name),
            )
        }),
    }
}

pub(crate) fn severity_to_state(code: Option<i32>) -> Result<Value, MappingError> {
    match code {
        None => Ok(Value::Null),
        Some(code) => severity_name(code)
            .map(Value::from)
            .ok_or_else(|| MappingError::unsupported("alert severity", code.to_string())),
    }
}

pub(crate) fn triggering_attribute() -> Attribute {
    AttributeBuilder::bool("triggering")
        .optional()
        .computed()
        .default(StaticDefault::bool(false))
        .description("Whether the alert opens an incident")
        .build()
}

pub(crate) fn grace_period_attribute() -> Attribute {
    AttributeBuilder::int("grace_period")
        .optional()
        .description("Milliseconds an alert stays open after the violation ended")
        .build()
}

pub(crate) fn alert_channel_ids_attribute() -> Attribute {
    AttributeBuilder::string_set(ALERT_CHANNEL_IDS)
        .optional()
        .description("Ids of the alerting channels to notify")
        .build()
}

/// `alert_channels` block with channel ids per severity
pub(crate) fn alert_channels_schema_block() -> NestedBlock {
    let block = CHANNEL_SEVERITIES
        .iter()
        .fold(
            BlockBuilder::new().description("Alerting channels per severity"),
            |builder, (name, _)| {
                builder.attribute(AttributeBuilder::string_set(name).optional().build())
            },
        )
        .build();
    NestedBlock::list(ALERT_CHANNELS, block).max_items(1)
}

pub(crate) fn alert_channels_from_state(state: &Value) -> AlertChannels {
    let mut channels = AlertChannels::new();
    if let Some(block) = state.get_block(ALERT_CHANNELS) {
        for (name, key) in CHANNEL_SEVERITIES {
            let ids = block.get_string_list(name);
            if !ids.is_empty() {
                channels.insert(key.to_string(), ids);
            }
        }
    }
    channels
}

pub(crate) fn alert_channels_to_state(channels: &AlertChannels) -> Value {
    if channels.values().all(Vec::is_empty) {
        return Value::Null;
    }
    super::single_block(CHANNEL_SEVERITIES.iter().map(|(name, key)| {
        let ids = channels.get(*key).cloned().unwrap_or_default();
        (*name, Value::string_set_or_null(ids))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::single_block;

    const SHAPES: &[RuleShape] = &[
        RuleShape {
            name: "slowness",
            alert_type: "slowness",
            fields: &[RuleField::MetricName, RuleField::Aggregation],
        },
        RuleShape {
            name: "status_code",
            alert_type: "statusCode",
            fields: &[
                RuleField::MetricName,
                RuleField::Aggregation,
                RuleField::StatusCodeStart,
                RuleField::StatusCodeEnd,
            ],
        },
    ];

    fn root(state: &Value) -> BlockReader<'_> {
        BlockReader::new(state, AttributePath::root())
    }

    #[test]
    fn the_configured_shape_sets_the_alert_type() {
        let rule_block = Value::object([
            ("slowness", Value::Null),
            (
                "status_code",
                single_block([
                    ("metric_name", Value::from("httpStatus")),
                    ("aggregation", Value::Null),
                    ("status_code_start", Value::from(500i64)),
                    ("status_code_end", Value::from(599i64)),
                ]),
            ),
        ]);
        let rule = rule_from_shapes(&root(&rule_block), SHAPES).unwrap();
        assert_eq!(rule.alert_type, "statusCode");
        assert_eq!(rule.status_code_start, Some(500));
        assert_eq!(rule.aggregation, None);
        assert_eq!(rule_to_shapes(&rule, SHAPES).unwrap(), rule_block);
    }

    #[test]
    fn unknown_alert_types_are_unsupported() {
        let rule = AlertRule {
            alert_type: "carrierPigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            rule_to_shapes(&rule, SHAPES),
            Err(MappingError::UnsupportedVariant { .. })
        ));
    }

    #[test]
    fn rules_without_a_rule_block_point_at_it() {
        let state = Value::object([(
            RULES,
            Value::List(vec![Value::object([(RULE, Value::List(vec![]))])]),
        )]);
        match rules_from_state(&root(&state), |r| rule_from_shapes(r, SHAPES)) {
            Err(MappingError::ParseError { path, .. }) => {
                assert_eq!(path, AttributePath::new(RULES).index(0).attribute(RULE))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn channels_are_keyed_by_wire_severity() {
        let state = Value::object([(
            ALERT_CHANNELS,
            single_block([
                ("warning", Value::string_set(["c1", "c2"])),
                ("critical", Value::Null),
            ]),
        )]);
        let channels = alert_channels_from_state(&state);
        assert_eq!(
            channels,
            AlertChannels::from([(
                SEVERITY_KEY_WARNING.to_string(),
                vec!["c1".to_string(), "c2".to_string()]
            )])
        );
        assert_eq!(alert_channels_to_state(&channels), state.get(ALERT_CHANNELS).clone());
        assert!(alert_channels_to_state(&AlertChannels::new()).is_null());
    }

    #[test]
    fn severity_names_map_to_codes() {
        let state = Value::object([("severity", Value::from("critical"))]);
        assert_eq!(severity_from_state(&state).unwrap(), Some(10));
        assert_eq!(severity_to_state(Some(5)).unwrap(), Value::from("warning"));
        assert!(severity_to_state(Some(7)).is_err());
        assert_eq!(severity_from_state(&Value::Null).unwrap(), None);
    }
}
