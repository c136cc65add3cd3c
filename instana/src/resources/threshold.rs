//! Severity and time thresholds of the alert configs
//!
//! A `threshold` block holds one `warning` and one `critical` block, each
//! choosing a static value or a baseline. On the wire these become the
//! `thresholds` map keyed `WARNING`/`CRITICAL`.

use std::collections::BTreeMap;
use tfplug::schema::Block;
use tfplug::validator::{IntBetween, OneOf};
use tfplug::{AttributeBuilder, AttributeType, BlockBuilder, NestedBlock, Value};

use super::{single_block, BlockReader};
use crate::api::models::alert_config::{
    ThresholdRule, TimeThreshold, SEVERITY_KEY_CRITICAL, SEVERITY_KEY_WARNING,
};
use crate::resourcehandle::MappingError;

pub const THRESHOLD: &str = "threshold";
pub const THRESHOLD_OPERATOR: &str = "threshold_operator";
pub const TIME_THRESHOLD: &str = "time_threshold";

pub const THRESHOLD_OPERATORS: &[&str] = &[">", ">=", "<", "<="];
pub const SEASONALITIES: &[&str] = &["DAILY", "WEEKLY"];
pub const IMPACT_MEASUREMENT_METHODS: &[&str] = &["AGGREGATED", "PER_WINDOW"];

const SEVERITIES: [(&str, &str); 2] = [
    ("warning", SEVERITY_KEY_WARNING),
    ("critical", SEVERITY_KEY_CRITICAL),
];

const STATIC: &str = "static";
const ADAPTIVE_BASELINE: &str = "adaptive_baseline";
const HISTORIC_BASELINE: &str = "historic_baseline";

pub(crate) fn threshold_operator_attribute() -> tfplug::schema::Attribute {
    AttributeBuilder::string(THRESHOLD_OPERATOR)
        .optional()
        .validator(OneOf::new(THRESHOLD_OPERATORS.iter().copied()))
        .description("Comparison of the metric against the thresholds")
        .build()
}

fn seasonality() -> tfplug::schema::Attribute {
    AttributeBuilder::string("seasonality")
        .required()
        .validator(OneOf::new(SEASONALITIES.iter().copied()))
        .build()
}

fn threshold_rule_block() -> Block {
    let deviation_factor = || AttributeBuilder::float("deviation_factor").required().build();
    BlockBuilder::new()
        .block(
            NestedBlock::list(
                STATIC,
                BlockBuilder::new()
                    .attribute(AttributeBuilder::float("value").required().build())
                    .build(),
            )
            .max_items(1),
        )
        .block(
            NestedBlock::list(
                ADAPTIVE_BASELINE,
                BlockBuilder::new()
                    .attribute(deviation_factor())
                    .attribute(AttributeBuilder::float("adaptability").required().build())
                    .attribute(seasonality())
                    .build(),
            )
            .max_items(1),
        )
        .block(
            NestedBlock::list(
                HISTORIC_BASELINE,
                BlockBuilder::new()
                    .attribute(
                        AttributeBuilder::new(
                            "baseline",
                            AttributeType::list(AttributeType::list(AttributeType::Float)),
                        )
                        .optional()
                        .computed()
                        .description("Baseline samples computed by the Platform")
                        .build(),
                    )
                    .attribute(deviation_factor())
                    .attribute(seasonality())
                    .build(),
            )
            .max_items(1),
        )
        .exactly_one_of(&[STATIC, ADAPTIVE_BASELINE, HISTORIC_BASELINE])
        .build()
}

/// `threshold` block with the per severity thresholds
pub(crate) fn threshold_schema_block() -> NestedBlock {
    let block = SEVERITIES
        .iter()
        .fold(
            BlockBuilder::new().description("Thresholds per severity"),
            |builder, (name, _)| {
                builder.block(NestedBlock::list(name, threshold_rule_block()).max_items(1))
            },
        )
        .build();
    NestedBlock::list(THRESHOLD, block).max_items(1)
}

/// Values are sent with two decimals
fn round_static(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn threshold_rule_from_state(reader: &BlockReader) -> Result<ThresholdRule, MappingError> {
    if let Some(fixed) = reader.child(STATIC) {
        return Ok(ThresholdRule::Static {
            operator: None,
            value: Some(round_static(fixed.float("value")?)),
        });
    }
    if let Some(adaptive) = reader.child(ADAPTIVE_BASELINE) {
        return Ok(ThresholdRule::AdaptiveBaseline {
            operator: None,
            deviation_factor: adaptive.float("deviation_factor")?,
            adaptability: adaptive.float("adaptability")?,
            seasonality: adaptive.string("seasonality")?,
        });
    }
    if let Some(historic) = reader.child(HISTORIC_BASELINE) {
        let baseline = historic
            .block
            .get("baseline")
            .as_list()
            .unwrap_or(&[])
            .iter()
            .map(|row| {
                row.as_list()
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(Value::as_f64)
                    .collect()
            })
            .collect();
        return Ok(ThresholdRule::HistoricBaseline {
            operator: None,
            baseline,
            deviation_factor: historic.float("deviation_factor")?,
            seasonality: historic.string("seasonality")?,
            last_updated: None,
        });
    }
    Err(MappingError::parse(
        reader.path.clone(),
        "one of static, adaptive_baseline or historic_baseline must be set",
    ))
}

fn threshold_rule_to_state(rule: &ThresholdRule) -> Value {
    let mut state = Value::object([
        (STATIC, Value::Null),
        (ADAPTIVE_BASELINE, Value::Null),
        (HISTORIC_BASELINE, Value::Null),
    ]);
    match rule {
        ThresholdRule::Static { value, .. } => {
            state.set(STATIC, single_block([("value", Value::from(*value))]));
        }
        ThresholdRule::AdaptiveBaseline {
            deviation_factor,
            adaptability,
            seasonality,
            ..
        } => state.set(
            ADAPTIVE_BASELINE,
            single_block([
                ("deviation_factor", Value::from(*deviation_factor)),
                ("adaptability", Value::from(*adaptability)),
                ("seasonality", Value::from(seasonality.as_str())),
            ]),
        ),
        ThresholdRule::HistoricBaseline {
            baseline,
            deviation_factor,
            seasonality,
            ..
        } => {
            let baseline = if baseline.is_empty() {
                Value::Null
            } else {
                Value::List(
                    baseline
                        .iter()
                        .map(|row| Value::List(row.iter().copied().map(Value::from).collect()))
                        .collect(),
                )
            };
            state.set(
                HISTORIC_BASELINE,
                single_block([
                    ("baseline", baseline),
                    ("deviation_factor", Value::from(*deviation_factor)),
                    ("seasonality", Value::from(seasonality.as_str())),
                ]),
            )
        }
    }
    state
}

/// Thresholds of the `threshold` block under `reader`, keyed by wire severity
pub(crate) fn thresholds_from_state(
    reader: &BlockReader,
) -> Result<BTreeMap<String, ThresholdRule>, MappingError> {
    let mut thresholds = BTreeMap::new();
    let Some(threshold) = reader.child(THRESHOLD) else {
        return Ok(thresholds);
    };
    for (name, key) in SEVERITIES {
        if let Some(severity) = threshold.child(name) {
            thresholds.insert(key.to_string(), threshold_rule_from_state(&severity)?);
        }
    }
    Ok(thresholds)
}

pub(crate) fn thresholds_to_state(thresholds: &BTreeMap<String, ThresholdRule>) -> Value {
    if thresholds.is_empty() {
        return Value::Null;
    }
    single_block(SEVERITIES.iter().map(|(name, key)| {
        let value = match thresholds.get(*key) {
            Some(rule) => Value::List(vec![threshold_rule_to_state(rule)]),
            None => Value::Null,
        };
        (*name, value)
    }))
}

/// Shapes a time threshold can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeThresholdKind {
    RequestImpact,
    ViolationsInPeriod,
    ViolationsInSequence,
    UserImpactOfViolationsInSequence,
}

impl TimeThresholdKind {
    pub const ALL: [TimeThresholdKind; 4] = [
        TimeThresholdKind::RequestImpact,
        TimeThresholdKind::ViolationsInPeriod,
        TimeThresholdKind::ViolationsInSequence,
        TimeThresholdKind::UserImpactOfViolationsInSequence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimeThresholdKind::RequestImpact => "request_impact",
            TimeThresholdKind::ViolationsInPeriod => "violations_in_period",
            TimeThresholdKind::ViolationsInSequence => "violations_in_sequence",
            TimeThresholdKind::UserImpactOfViolationsInSequence => {
                "user_impact_of_violations_in_sequence"
            }
        }
    }

    fn of(threshold: &TimeThreshold) -> Self {
        match threshold {
            TimeThreshold::RequestImpact { .. } => TimeThresholdKind::RequestImpact,
            TimeThreshold::ViolationsInPeriod { .. } => TimeThresholdKind::ViolationsInPeriod,
            TimeThreshold::ViolationsInSequence { .. } => TimeThresholdKind::ViolationsInSequence,
            TimeThreshold::UserImpactOfViolationsInSequence { .. } => {
                TimeThresholdKind::UserImpactOfViolationsInSequence
            }
        }
    }

    fn block(self) -> Block {
        let time_window = |required: bool| {
            let builder = AttributeBuilder::int("time_window")
                .description("Evaluation window in milliseconds");
            if required {
                builder.required().build()
            } else {
                builder.optional().build()
            }
        };
        let violations = |name: &str, required: bool| {
            let builder = AttributeBuilder::int(name).validator(IntBetween { min: 1, max: 12 });
            if required {
                builder.required().build()
            } else {
                builder.optional().build()
            }
        };
        let builder = BlockBuilder::new();
        let builder = match self {
            TimeThresholdKind::RequestImpact => builder
                .attribute(time_window(true))
                .attribute(AttributeBuilder::int("requests").required().build()),
            TimeThresholdKind::ViolationsInPeriod => builder
                .attribute(time_window(true))
                .attribute(violations("violations", true)),
            TimeThresholdKind::ViolationsInSequence => builder
                .attribute(time_window(false))
                .attribute(violations("violations_count", false)),
            TimeThresholdKind::UserImpactOfViolationsInSequence => builder
                .attribute(time_window(true))
                .attribute(
                    AttributeBuilder::string("impact_measurement_method")
                        .optional()
                        .validator(OneOf::new(IMPACT_MEASUREMENT_METHODS.iter().copied()))
                        .build(),
                )
                .attribute(AttributeBuilder::int("users").optional().build())
                .attribute(AttributeBuilder::float("user_percentage").optional().build()),
        };
        builder.build()
    }

    fn from_state(self, reader: &BlockReader) -> Result<TimeThreshold, MappingError> {
        let block = reader.block;
        Ok(match self {
            TimeThresholdKind::RequestImpact => TimeThreshold::RequestImpact {
                time_window: reader.int("time_window")?,
                requests: reader.int("requests")?,
            },
            TimeThresholdKind::ViolationsInPeriod => TimeThreshold::ViolationsInPeriod {
                time_window: reader.int("time_window")?,
                violations: reader.int("violations")?,
            },
            TimeThresholdKind::ViolationsInSequence => TimeThreshold::ViolationsInSequence {
                time_window: block.get_i64("time_window"),
                violations_count: block.get_i64("violations_count"),
            },
            TimeThresholdKind::UserImpactOfViolationsInSequence => {
                TimeThreshold::UserImpactOfViolationsInSequence {
                    time_window: reader.int("time_window")?,
                    impact_measurement_method: reader.optional_string("impact_measurement_method"),
                    users: block.get_i64("users"),
                    user_percentage: block.get_f64("user_percentage"),
                }
            }
        })
    }
}

fn time_threshold_fields(threshold: &TimeThreshold) -> Value {
    match threshold {
        TimeThreshold::RequestImpact {
            time_window,
            requests,
        } => Value::object([
            ("time_window", Value::from(*time_window)),
            ("requests", Value::from(*requests)),
        ]),
        TimeThreshold::ViolationsInPeriod {
            time_window,
            violations,
        } => Value::object([
            ("time_window", Value::from(*time_window)),
            ("violations", Value::from(*violations)),
        ]),
        TimeThreshold::ViolationsInSequence {
            time_window,
            violations_count,
        } => Value::object([
            ("time_window", Value::from(*time_window)),
            ("violations_count", Value::from(*violations_count)),
        ]),
        TimeThreshold::UserImpactOfViolationsInSequence {
            time_window,
            impact_measurement_method,
            users,
            user_percentage,
        } => Value::object([
            ("time_window", Value::from(*time_window)),
            (
                "impact_measurement_method",
                Value::from(impact_measurement_method.clone()),
            ),
            ("users", Value::from(*users)),
            ("user_percentage", Value::from(*user_percentage)),
        ]),
    }
}

/// `time_threshold` block offering `kinds`
pub(crate) fn time_threshold_schema_block(kinds: &[TimeThresholdKind]) -> NestedBlock {
    let names: Vec<&str> = kinds.iter().map(|kind| kind.name()).collect();
    let block = kinds
        .iter()
        .fold(
            BlockBuilder::new().description("When violations open an alert"),
            |builder, kind| {
                builder.block(NestedBlock::list(kind.name(), kind.block()).max_items(1))
            },
        )
        .exactly_one_of(&names)
        .build();
    NestedBlock::list(TIME_THRESHOLD, block).max_items(1)
}

pub(crate) fn time_threshold_from_state(
    state: &BlockReader,
    kinds: &[TimeThresholdKind],
) -> Result<Option<TimeThreshold>, MappingError> {
    let Some(reader) = state.child(TIME_THRESHOLD) else {
        return Ok(None);
    };
    for kind in kinds {
        if let Some(fields) = reader.child(kind.name()) {
            return kind.from_state(&fields).map(Some);
        }
    }
    Err(MappingError::parse(
        reader.path.clone(),
        "a time threshold kind must be configured",
    ))
}

/// State of a wire time threshold; kinds outside `kinds` are rejected
pub(crate) fn time_threshold_to_state(
    threshold: Option<&TimeThreshold>,
    kinds: &[TimeThresholdKind],
) -> Result<Value, MappingError> {
    let Some(threshold) = threshold else {
        return Ok(Value::Null);
    };
    let kind = TimeThresholdKind::of(threshold);
    if !kinds.contains(&kind) {
        return Err(MappingError::unsupported("time threshold", kind.name()));
    }
    Ok(single_block(kinds.iter().map(|k| {
        let value = if *k == kind {
            Value::List(vec![time_threshold_fields(threshold)])
        } else {
            Value::Null
        };
        (k.name(), value)
    })))
}
