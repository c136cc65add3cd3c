//! instana_custom_event_specification
//!
//! The single `rules` block holds one list per rule kind. Every element of
//! those lists becomes one wire rule tagged with its `ruleType`.

use tfplug::defaults::StaticDefault;
use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{
    id_attribute, single_block, string_attribute, tag_filter_attribute, tag_filter_from_state,
    tag_filter_to_state, BlockReader,
};
use crate::api::models::event_specification::{
    severity_code, severity_name, MetricPattern, RuleSpecification,
};
use crate::api::models::CustomEventSpecification;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{
    drop_attributes, required_string, MappingError, ResourceHandle, ResourceMetaData,
    StateUpgrader,
};

pub const RESOURCE_NAME: &str = "instana_custom_event_specification";

pub const RULES: &str = "rules";
pub const SEVERITIES: &[&str] = &["warning", "critical"];
pub const LOGICAL_OPERATORS: &[&str] = &["AND", "OR"];
pub const DEFAULT_METRIC_PATTERN_OPERATOR: &str = "EQUALS";

/// Rule kinds; block name in state and `ruleType` on the wire coincide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    EntityCount,
    EntityCountVerification,
    EntityVerification,
    HostAvailability,
    System,
    Threshold,
}

impl RuleKind {
    pub const ALL: [RuleKind; 6] = [
        RuleKind::EntityCount,
        RuleKind::EntityCountVerification,
        RuleKind::EntityVerification,
        RuleKind::HostAvailability,
        RuleKind::System,
        RuleKind::Threshold,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleKind::EntityCount => "entity_count",
            RuleKind::EntityCountVerification => "entity_count_verification",
            RuleKind::EntityVerification => "entity_verification",
            RuleKind::HostAvailability => "host_availability",
            RuleKind::System => "system",
            RuleKind::Threshold => "threshold",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn block(self) -> Block {
        let builder = BlockBuilder::new().attribute(
            AttributeBuilder::string("severity")
                .required()
                .validator(OneOf::new(SEVERITIES.iter().copied()))
                .description("Severity of the raised event, warning or critical")
                .build(),
        );
        let int = |name: &str| AttributeBuilder::int(name).required().build();
        let condition = |b: BlockBuilder| {
            b.attribute(string_attribute("condition_operator", "Comparison of the condition"))
                .attribute(AttributeBuilder::float("condition_value").required().build())
        };
        let matching = |b: BlockBuilder| {
            b.attribute(string_attribute("matching_entity_type", "Entity type to match"))
                .attribute(string_attribute("matching_operator", "Operator matching the label"))
                .attribute(string_attribute("matching_entity_label", "Entity label to match"))
        };
        let builder = match self {
            RuleKind::EntityCount => condition(builder),
            RuleKind::EntityCountVerification => matching(condition(builder)),
            RuleKind::EntityVerification => matching(builder).attribute(int("offline_duration")),
            RuleKind::HostAvailability => builder
                .attribute(int("offline_duration"))
                .attribute(AttributeBuilder::int("close_after").optional().build())
                .attribute(tag_filter_attribute(
                    "tag_filter",
                    "Tag filter selecting the hosts",
                )),
            RuleKind::System => {
                builder.attribute(string_attribute("system_rule_id", "Id of the system rule"))
            }
            RuleKind::Threshold => condition(
                builder
                    .attribute(string_attribute("metric_name", "Metric to evaluate"))
                    .attribute(int("rollup"))
                    .attribute(int("window"))
                    .attribute(string_attribute("aggregation", "Aggregation of the metric")),
            )
            .block(NestedBlock::list("metric_pattern", metric_pattern_block()).max_items(1)),
        };
        builder.build()
    }
}

fn metric_pattern_block() -> Block {
    BlockBuilder::new()
        .description("Pattern selecting dynamic metrics")
        .attribute(string_attribute("prefix", "Prefix of the metric"))
        .attribute(AttributeBuilder::string("postfix").optional().build())
        .attribute(AttributeBuilder::string("placeholder").optional().build())
        .attribute(
            AttributeBuilder::string("operator")
                .optional()
                .computed()
                .default(StaticDefault::string(DEFAULT_METRIC_PATTERN_OPERATOR))
                .build(),
        )
        .build()
}

fn rules_block() -> Block {
    RuleKind::ALL
        .into_iter()
        .fold(
            BlockBuilder::new().description("Rules raising the event"),
            |builder, kind| builder.block(NestedBlock::list(kind.name(), kind.block())),
        )
        .build()
}

#[derive(Default)]
pub struct CustomEventSpecificationResource;

fn rule_from_state(
    kind: RuleKind,
    reader: &BlockReader,
) -> Result<RuleSpecification, MappingError> {
    let severity_text = reader.string("severity")?;
    let severity = severity_code(&severity_text).ok_or_else(|| {
        MappingError::parse(
            reader.path.clone().attribute("severity"),
            format!("unknown severity '{}'", severity_text),
        )
    })?;
    let mut rule = RuleSpecification {
        rule_type: kind.name().to_string(),
        severity,
        ..Default::default()
    };
    let with_condition = |rule: &mut RuleSpecification| -> Result<(), MappingError> {
        rule.condition_operator = Some(reader.string("condition_operator")?);
        rule.condition_value = Some(reader.float("condition_value")?);
        Ok(())
    };
    let with_matching = |rule: &mut RuleSpecification| -> Result<(), MappingError> {
        rule.matching_entity_type = Some(reader.string("matching_entity_type")?);
        rule.matching_operator = Some(reader.string("matching_operator")?);
        rule.matching_entity_label = Some(reader.string("matching_entity_label")?);
        Ok(())
    };
    match kind {
        RuleKind::EntityCount => with_condition(&mut rule)?,
        RuleKind::EntityCountVerification => {
            with_condition(&mut rule)?;
            with_matching(&mut rule)?;
        }
        RuleKind::EntityVerification => {
            with_matching(&mut rule)?;
            rule.offline_duration = Some(reader.int("offline_duration")?);
        }
        RuleKind::HostAvailability => {
            rule.offline_duration = Some(reader.int("offline_duration")?);
            rule.close_after = reader.block.get_i64("close_after");
            rule.tag_filter = tag_filter_from_state(reader.block, "tag_filter").map_err(|e| {
                match e {
                    MappingError::ParseError { message, .. } => MappingError::parse(
                        reader.path.clone().attribute("tag_filter"),
                        message,
                    ),
                    other => other,
                }
            })?;
        }
        RuleKind::System => rule.system_rule_id = Some(reader.string("system_rule_id")?),
        RuleKind::Threshold => {
            with_condition(&mut rule)?;
            rule.metric_name = Some(reader.string("metric_name")?);
            rule.rollup = Some(reader.int("rollup")?);
            rule.window = Some(reader.int("window")?);
            rule.aggregation = Some(reader.string("aggregation")?);
            rule.metric_pattern = reader.block.get_block("metric_pattern").map(|pattern| {
                MetricPattern {
                    prefix: pattern.get_string("prefix").unwrap_or_default(),
                    postfix: pattern.get_non_empty_string("postfix"),
                    placeholder: pattern.get_non_empty_string("placeholder"),
                    operator: pattern
                        .get_non_empty_string("operator")
                        .unwrap_or_else(|| DEFAULT_METRIC_PATTERN_OPERATOR.to_string()),
                }
            });
        }
    }
    Ok(rule)
}

/// `prior` is the stored rule at the same position, consulted for the tag
/// filter spelling
fn rule_to_state(
    kind: RuleKind,
    rule: &RuleSpecification,
    prior: &Value,
) -> Result<Value, MappingError> {
    let severity = severity_name(rule.severity)
        .ok_or_else(|| MappingError::unsupported("rule severity", rule.severity.to_string()))?;
    let s = |v: &Option<String>| Value::from(v.clone());
    let mut state = Value::object([("severity", Value::from(severity))]);
    let mut put = |name: &str, value: Value| state.set(name, value);
    match kind {
        RuleKind::EntityCount => {
            put("condition_operator", s(&rule.condition_operator));
            put("condition_value", Value::from(rule.condition_value));
        }
        RuleKind::EntityCountVerification => {
            put("condition_operator", s(&rule.condition_operator));
            put("condition_value", Value::from(rule.condition_value));
            put("matching_entity_type", s(&rule.matching_entity_type));
            put("matching_operator", s(&rule.matching_operator));
            put("matching_entity_label", s(&rule.matching_entity_label));
        }
        RuleKind::EntityVerification => {
            put("matching_entity_type", s(&rule.matching_entity_type));
            put("matching_operator", s(&rule.matching_operator));
            put("matching_entity_label", s(&rule.matching_entity_label));
            put("offline_duration", Value::from(rule.offline_duration));
        }
        RuleKind::HostAvailability => {
            put("offline_duration", Value::from(rule.offline_duration));
            put("close_after", Value::from(rule.close_after));
            put(
                "tag_filter",
                tag_filter_to_state(prior.get("tag_filter"), rule.tag_filter.as_ref())?,
            );
        }
        RuleKind::System => put("system_rule_id", s(&rule.system_rule_id)),
        RuleKind::Threshold => {
            put("metric_name", s(&rule.metric_name));
            put("rollup", Value::from(rule.rollup));
            put("window", Value::from(rule.window));
            put("aggregation", s(&rule.aggregation));
            put("condition_operator", s(&rule.condition_operator));
            put("condition_value", Value::from(rule.condition_value));
            let pattern = match &rule.metric_pattern {
                Some(p) => single_block([
                    ("prefix", Value::from(p.prefix.as_str())),
                    ("postfix", s(&p.postfix)),
                    ("placeholder", s(&p.placeholder)),
                    ("operator", Value::from(p.operator.as_str())),
                ]),
                None => Value::Null,
            };
            put("metric_pattern", pattern);
        }
    }
    Ok(state)
}

impl ResourceHandle for CustomEventSpecificationResource {
    type Object = CustomEventSpecification;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Custom event raised when its rules match")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the custom event specification"))
            .attribute(string_attribute("entity_type", "Entity type the event is raised on"))
            .attribute(
                AttributeBuilder::string("query")
                    .optional()
                    .description("Dynamic focus query limiting the entities")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("triggering")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .description("Whether the event triggers an incident")
                    .build(),
            )
            .attribute(AttributeBuilder::string("description").optional().build())
            .attribute(
                AttributeBuilder::int("expiration_time")
                    .optional()
                    .description("Milliseconds after which the event expires")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("enabled")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("rule_logical_operator")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("AND"))
                    .validator(OneOf::new(LOGICAL_OPERATORS.iter().copied()))
                    .description("How the rules are combined, AND or OR")
                    .build(),
            )
            .block(
                NestedBlock::list(RULES, rules_block())
                    .min_items(1)
                    .max_items(1),
            )
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<CustomEventSpecification> {
        client.custom_event_specifications()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<CustomEventSpecification, MappingError> {
        let mut rules = Vec::new();
        if let Some(rules_block) = state.get_block(RULES) {
            for kind in RuleKind::ALL {
                for (idx, rule) in rules_block.get_blocks(kind.name()).iter().enumerate() {
                    let reader = BlockReader {
                        block: rule,
                        path: AttributePath::new(RULES)
                            .index(0)
                            .attribute(kind.name())
                            .index(idx as i64),
                    };
                    rules.push(rule_from_state(kind, &reader)?);
                }
            }
        }
        if rules.is_empty() {
            return Err(MappingError::parse(
                AttributePath::new(RULES),
                "at least one rule must be configured",
            ));
        }
        Ok(CustomEventSpecification {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            entity_type: required_string(state, "entity_type")?,
            query: state.get_non_empty_string("query"),
            triggering: state.get_bool("triggering").unwrap_or(false),
            description: state.get_non_empty_string("description"),
            expiration_time: state.get_i64("expiration_time"),
            enabled: state.get_bool("enabled").unwrap_or(true),
            rule_logical_operator: Some(
                state
                    .get_non_empty_string("rule_logical_operator")
                    .unwrap_or_else(|| "AND".to_string()),
            ),
            rules,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        spec: &CustomEventSpecification,
    ) -> Result<Value, MappingError> {
        let stored = state.get_block(RULES);
        let mut by_kind: Vec<(RuleKind, Vec<Value>)> =
            RuleKind::ALL.into_iter().map(|k| (k, Vec::new())).collect();
        for rule in &spec.rules {
            let kind = RuleKind::from_name(&rule.rule_type)
                .ok_or_else(|| MappingError::unsupported("rule type", rule.rule_type.as_str()))?;
            if let Some((_, rules)) = by_kind.iter_mut().find(|(k, _)| *k == kind) {
                let prior = stored
                    .and_then(|r| r.get_blocks(kind.name()).get(rules.len()))
                    .unwrap_or(&Value::Null);
                rules.push(rule_to_state(kind, rule, prior)?);
            }
        }
        let rules = Value::object(by_kind.into_iter().map(|(kind, rules)| {
            let value = if rules.is_empty() {
                Value::Null
            } else {
                Value::List(rules)
            };
            (kind.name(), value)
        }));

        Ok(Value::object([
            ("id", Value::from(spec.id.as_str())),
            ("name", Value::from(spec.name.as_str())),
            ("entity_type", Value::from(spec.entity_type.as_str())),
            ("query", Value::from(spec.query.clone())),
            ("triggering", Value::from(spec.triggering)),
            ("description", Value::from(spec.description.clone())),
            ("expiration_time", Value::from(spec.expiration_time)),
            ("enabled", Value::from(spec.enabled)),
            (
                "rule_logical_operator",
                Value::from(spec.rule_logical_operator.as_deref().unwrap_or("AND")),
            ),
            (RULES, Value::List(vec![rules])),
        ]))
    }

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        vec![StateUpgrader::new(0, |state| {
            Ok(drop_attributes(state, &["full_name"]))
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_state(rules: Value) -> Value {
        Value::object([
            ("id", Value::from("ces1")),
            ("name", Value::from("disk")),
            ("entity_type", Value::from("host")),
            ("query", Value::Null),
            ("triggering", Value::from(false)),
            ("description", Value::Null),
            ("expiration_time", Value::Null),
            ("enabled", Value::from(true)),
            ("rule_logical_operator", Value::from("AND")),
            (RULES, Value::List(vec![rules])),
        ])
    }

    fn threshold_rules() -> Value {
        Value::object([
            ("entity_count", Value::Null),
            ("entity_count_verification", Value::Null),
            ("entity_verification", Value::Null),
            ("host_availability", Value::Null),
            ("system", Value::Null),
            (
                "threshold",
                Value::List(vec![Value::object([
                    ("severity", Value::from("critical")),
                    ("metric_name", Value::from("fs.used")),
                    ("rollup", Value::from(0_i64)),
                    ("window", Value::from(60000_i64)),
                    ("aggregation", Value::from("avg")),
                    ("condition_operator", Value::from(">")),
                    ("condition_value", Value::from(0.9)),
                    (
                        "metric_pattern",
                        single_block([
                            ("prefix", Value::from("fs")),
                            ("postfix", Value::from("used")),
                            ("placeholder", Value::Null),
                            ("operator", Value::from("EQUALS")),
                        ]),
                    ),
                ])]),
            ),
        ])
    }

    #[test]
    fn severity_is_sent_as_code() {
        let spec = CustomEventSpecificationResource
            .state_to_object(&spec_state(threshold_rules()), &Value::Null)
            .unwrap();
        assert_eq!(spec.rules.len(), 1);
        assert_eq!(spec.rules[0].rule_type, "threshold");
        assert_eq!(spec.rules[0].severity, 10);
        assert_eq!(
            spec.rules[0].metric_pattern.as_ref().map(|p| p.operator.as_str()),
            Some("EQUALS")
        );
    }

    #[test]
    fn threshold_rule_round_trips() {
        let state = spec_state(threshold_rules());
        let spec = CustomEventSpecificationResource
            .state_to_object(&state, &Value::Null)
            .unwrap();
        let back = CustomEventSpecificationResource
            .object_to_state(&state, &spec)
            .unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn host_availability_tag_filter_spelling_follows_state() {
        let rules = Value::object([(
            "host_availability",
            Value::List(vec![Value::object([
                ("severity", Value::from("warning")),
                ("offline_duration", Value::from(60000_i64)),
                ("close_after", Value::Null),
                ("tag_filter", Value::from("host.name equals 'db'")),
            ])]),
        )]);
        let planned = spec_state(rules);
        let spec = CustomEventSpecificationResource
            .state_to_object(&planned, &Value::Null)
            .unwrap();
        assert_eq!(spec.rules[0].severity, 5);

        let tag_filter = |state: &Value| {
            state.get_block(RULES).unwrap().get_blocks("host_availability")[0]
                .get_string("tag_filter")
        };
        let imported = CustomEventSpecificationResource
            .object_to_state(&Value::Null, &spec)
            .unwrap();
        assert_eq!(tag_filter(&imported).as_deref(), Some("host.name EQUALS 'db'"));

        let written = CustomEventSpecificationResource
            .object_to_state(&planned, &spec)
            .unwrap();
        assert_eq!(tag_filter(&written).as_deref(), Some("host.name equals 'db'"));
    }

    #[test]
    fn unknown_rule_type_is_unsupported() {
        let spec = CustomEventSpecification {
            rules: vec![RuleSpecification {
                rule_type: "change".to_string(),
                severity: 5,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(
            CustomEventSpecificationResource.object_to_state(&Value::Null, &spec),
            Err(MappingError::unsupported("rule type", "change"))
        );
    }

    #[test]
    fn unknown_severity_code_is_unsupported() {
        let spec = CustomEventSpecification {
            rules: vec![RuleSpecification {
                rule_type: "system".to_string(),
                severity: 7,
                system_rule_id: Some("r".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            CustomEventSpecificationResource.object_to_state(&Value::Null, &spec),
            Err(MappingError::UnsupportedVariant { .. })
        ));
    }

    #[test]
    fn a_spec_without_rules_is_rejected() {
        let state = spec_state(Value::object([("system", Value::Null)]));
        assert!(matches!(
            CustomEventSpecificationResource.state_to_object(&state, &Value::Null),
            Err(MappingError::ParseError { .. })
        ));
    }
}
