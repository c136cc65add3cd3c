//! instana_slo_alert_config
//!
//! `alert_type` selects the rule pair sent to the Platform. Burn rate alerts
//! carry their thresholds in `burn_rate_config` instead of `threshold`.

use tfplug::defaults::StaticDefault;
use tfplug::validator::{IntBetween, OneOf};
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::alerts::{name_attribute, triggering_attribute, SEVERITIES};
use super::threshold::{THRESHOLD, TIME_THRESHOLD};
use super::{id_attribute, single_block, string_attribute, BlockReader};
use crate::api::models::event_specification::{severity_code, severity_name};
use crate::api::models::slo::{
    BurnRateConfig, SloAlertRule, SloAlertThreshold, SloAlertTimeThreshold,
};
use crate::api::models::SloAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{
    pass_through, required_string, MappingError, ResourceHandle, ResourceMetaData, StateUpgrader,
};

pub const RESOURCE_NAME: &str = "instana_slo_alert_config";

pub const ALERT_TYPE: &str = "alert_type";
pub const BURN_RATE_CONFIG: &str = "burn_rate_config";
pub const STATIC_THRESHOLD: &str = "staticThreshold";

const BURN_RATE_V2: &str = "burn_rate_v2";
const OPERATORS: &[&str] = &[">", ">=", "=", "<=", "<"];

/// `alert_type` with the rule type and metric it is sent as
const ALERT_TYPES: &[(&str, &str, &str)] = &[
    ("status", "SERVICE_LEVELS_OBJECTIVE", "STATUS"),
    ("error_budget", "ERROR_BUDGET", "BURNED_PERCENTAGE"),
    (BURN_RATE_V2, "ERROR_BUDGET", "BURN_RATE_V2"),
];

fn rule_for(alert_type: &str) -> Option<SloAlertRule> {
    ALERT_TYPES
        .iter()
        .find(|(name, _, _)| *name == alert_type)
        .map(|(_, rule_type, metric)| SloAlertRule {
            alert_type: rule_type.to_string(),
            metric: metric.to_string(),
        })
}

/// `alert_type` of a wire rule; plain burn rate rules read as error budget alerts
fn alert_type_of(rule: &SloAlertRule) -> Result<&'static str, MappingError> {
    if rule.alert_type == "ERROR_BUDGET" && rule.metric == "BURN_RATE" {
        return Ok("error_budget");
    }
    ALERT_TYPES
        .iter()
        .find(|(_, rule_type, metric)| *rule_type == rule.alert_type && *metric == rule.metric)
        .map(|(name, _, _)| *name)
        .ok_or_else(|| {
            MappingError::unsupported(
                "SLO alert rule",
                format!("{}/{}", rule.alert_type, rule.metric),
            )
        })
}

fn operator_attribute(name: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::string(name)
        .required()
        .validator(OneOf::new(OPERATORS.iter().copied()))
        .build()
}

fn threshold_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("Static threshold of status and error budget alerts")
        .attribute(
            AttributeBuilder::string("type")
                .optional()
                .computed()
                .default(StaticDefault::string(STATIC_THRESHOLD))
                .validator(OneOf::new([STATIC_THRESHOLD]))
                .build(),
        )
        .attribute(operator_attribute("operator"))
        .attribute(AttributeBuilder::float("value").required().build())
        .build();
    NestedBlock::list(THRESHOLD, block).max_items(1)
}

fn time_threshold_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("How long a violation lasts before the alert opens and closes")
        .attribute(
            AttributeBuilder::int("warm_up")
                .required()
                .validator(IntBetween {
                    min: 1,
                    max: i64::MAX,
                })
                .description("Milliseconds the condition is violated before the alert opens")
                .build(),
        )
        .attribute(
            AttributeBuilder::int("cool_down")
                .optional()
                .validator(IntBetween {
                    min: 0,
                    max: i64::MAX,
                })
                .description("Milliseconds the condition is met before the alert closes")
                .build(),
        )
        .build();
    NestedBlock::list(TIME_THRESHOLD, block).min_items(1).max_items(1)
}

fn burn_rate_config_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("Burn rate window with its threshold")
        .attribute(string_attribute("alert_window_type", "Window type, e.g. SINGLE"))
        .attribute(string_attribute("duration", "Length of the window"))
        .attribute(string_attribute("duration_unit_type", "Unit of the window length"))
        .attribute(operator_attribute("threshold_operator"))
        .attribute(string_attribute("threshold_value", "Burn rate the alert opens at"))
        .build();
    NestedBlock::list(BURN_RATE_CONFIG, block)
}

fn parsed<T: std::str::FromStr>(reader: &BlockReader, name: &str) -> Result<T, MappingError>
where
    T::Err: std::fmt::Display,
{
    let text = reader.string(name)?;
    text.trim().parse().map_err(|e: T::Err| {
        MappingError::parse(
            reader.path.clone().attribute(name),
            format!("'{}' is not a number: {}", text, e),
        )
    })
}

fn burn_rates_from_state(root: &BlockReader) -> Result<Vec<BurnRateConfig>, MappingError> {
    root.children(BURN_RATE_CONFIG)
        .iter()
        .map(|config| {
            Ok(BurnRateConfig {
                alert_window_type: config.string("alert_window_type")?,
                duration: parsed(config, "duration")?,
                duration_unit_type: config.string("duration_unit_type")?,
                threshold: SloAlertThreshold {
                    threshold_type: STATIC_THRESHOLD.to_string(),
                    operator: config.string("threshold_operator")?,
                    value: parsed(config, "threshold_value")?,
                },
            })
        })
        .collect()
}

/// Stored text when it denotes `value`, the formatted value otherwise
fn number_text(prior: &Value, value: f64, format: impl Fn(f64) -> String) -> Value {
    match prior.as_str() {
        Some(text) if text.trim().parse::<f64>().is_ok_and(|stored| stored == value) => {
            Value::from(text)
        }
        _ => Value::from(format(value)),
    }
}

fn burn_rates_to_state(state: &Value, configs: &[BurnRateConfig]) -> Value {
    if configs.is_empty() {
        return Value::Null;
    }
    let prior = state.get_blocks(BURN_RATE_CONFIG);
    Value::List(
        configs
            .iter()
            .enumerate()
            .map(|(idx, config)| {
                let stored = prior.get(idx).cloned().unwrap_or(Value::Null);
                Value::object([
                    ("alert_window_type", Value::from(config.alert_window_type.as_str())),
                    (
                        "duration",
                        number_text(stored.get("duration"), config.duration as f64, |v| {
                            format!("{}", v as i64)
                        }),
                    ),
                    ("duration_unit_type", Value::from(config.duration_unit_type.as_str())),
                    (
                        "threshold_operator",
                        Value::from(config.threshold.operator.as_str()),
                    ),
                    (
                        "threshold_value",
                        number_text(stored.get("threshold_value"), config.threshold.value, |v| {
                            format!("{:.2}", v)
                        }),
                    ),
                ])
            })
            .collect(),
    )
}

#[derive(Default)]
pub struct SloAlertConfigResource;

impl ResourceHandle for SloAlertConfigResource {
    type Object = SloAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Alert on the status or error budget of SLOs")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(string_attribute("description", "Description of the alert"))
            .attribute(
                AttributeBuilder::string("severity")
                    .required()
                    .validator(OneOf::new(SEVERITIES.iter().copied()))
                    .description("Severity of the alert, warning or critical")
                    .build(),
            )
            .attribute(triggering_attribute())
            .attribute(
                AttributeBuilder::string(ALERT_TYPE)
                    .required()
                    .validator(OneOf::new(ALERT_TYPES.iter().map(|(name, _, _)| *name)))
                    .description("What the alert watches: status, error_budget or burn_rate_v2")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("slo_ids")
                    .required()
                    .description("Ids of the watched SLOs")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("alert_channel_ids")
                    .required()
                    .description("Ids of the alerting channels to notify")
                    .build(),
            )
            .block(threshold_block())
            .block(time_threshold_block())
            .block(burn_rate_config_block())
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<SloAlertConfig> {
        client.slo_alert_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<SloAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        let alert_type = root.string(ALERT_TYPE)?;
        let rule = rule_for(&alert_type).ok_or_else(|| {
            MappingError::parse(
                AttributePath::new(ALERT_TYPE),
                format!("unknown alert_type '{}'", alert_type),
            )
        })?;
        let burn_rate = alert_type == BURN_RATE_V2;
        let severity = root.string("severity")?;
        let threshold = match root.child(THRESHOLD) {
            Some(block) if !burn_rate => Some(SloAlertThreshold {
                threshold_type: block
                    .optional_string("type")
                    .unwrap_or_else(|| STATIC_THRESHOLD.to_string()),
                operator: block.string("operator")?,
                value: block.float("value")?,
            }),
            _ => None,
        };
        let time_threshold = root.child(TIME_THRESHOLD).ok_or_else(|| {
            MappingError::parse(AttributePath::new(TIME_THRESHOLD), "time_threshold must be set")
        })?;
        Ok(SloAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: required_string(state, "description")?,
            severity: severity_code(&severity).ok_or_else(|| {
                MappingError::parse(
                    AttributePath::new("severity"),
                    format!("unknown severity '{}'", severity),
                )
            })?,
            triggering: state.get_bool("triggering").unwrap_or(false),
            enabled: true,
            rule,
            threshold,
            slo_ids: state.get_string_list("slo_ids"),
            alert_channel_ids: state.get_string_list("alert_channel_ids"),
            time_threshold: SloAlertTimeThreshold {
                time_window: time_threshold.int("warm_up")?,
                expiry: time_threshold.block.get_i64("cool_down").unwrap_or(0),
            },
            burn_rate_config: if burn_rate {
                burn_rates_from_state(&root)?
            } else {
                Vec::new()
            },
            custom_payload_fields: payload::fields_from_state(state)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &SloAlertConfig,
    ) -> Result<Value, MappingError> {
        let severity = severity_name(config.severity).ok_or_else(|| {
            MappingError::unsupported("alert severity", config.severity.to_string())
        })?;
        let threshold = match &config.threshold {
            None => Value::Null,
            Some(threshold) => single_block([
                (
                    "type",
                    Value::from(if threshold.threshold_type == "static" {
                        STATIC_THRESHOLD
                    } else {
                        threshold.threshold_type.as_str()
                    }),
                ),
                ("operator", Value::from(threshold.operator.as_str())),
                ("value", Value::from(threshold.value)),
            ]),
        };
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            ("severity", Value::from(severity)),
            ("triggering", Value::from(config.triggering)),
            (ALERT_TYPE, Value::from(alert_type_of(&config.rule)?)),
            ("slo_ids", Value::string_set(config.slo_ids.clone())),
            ("alert_channel_ids", Value::string_set(config.alert_channel_ids.clone())),
            (THRESHOLD, threshold),
            (
                TIME_THRESHOLD,
                single_block([
                    ("warm_up", Value::from(config.time_threshold.time_window)),
                    ("cool_down", Value::from(config.time_threshold.expiry)),
                ]),
            ),
            (BURN_RATE_CONFIG, burn_rates_to_state(state, &config.burn_rate_config)),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
        ]))
    }

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        vec![StateUpgrader::new(0, pass_through)]
    }
}
