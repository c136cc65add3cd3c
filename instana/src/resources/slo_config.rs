//! instana_slo_config
//!
//! `entity`, `indicator` and `time_window` each offer one nested block per
//! variant; exactly one of them is configured. Ids are assigned by the
//! provider and carry the `SLOTF` prefix.

use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::alerts::AGGREGATIONS;
use super::threshold::THRESHOLD_OPERATORS;
use super::{
    id_attribute, single_block, string_attribute, tag_filter_attribute, tag_filter_to_state,
    BlockReader,
};
use crate::api::models::application_config::BOUNDARY_SCOPES;
use crate::api::models::slo::{RbacTag, SloEntity, SloIndicator, SloTimeWindow, SLO_ID_PREFIX};
use crate::api::models::{SloConfig, TagFilter};
use crate::api::{Client, RestResource};
use crate::resourcehandle::{
    generate_id, required_string, MappingError, ResourceHandle, ResourceMetaData,
};

pub const RESOURCE_NAME: &str = "instana_slo_config";

pub const ENTITY: &str = "entity";
pub const INDICATOR: &str = "indicator";
pub const TIME_WINDOW: &str = "time_window";
pub const RBAC_TAGS: &str = "rbac_tags";
pub const FILTER_EXPRESSION: &str = "filter_expression";

pub const DEFAULT_AGGREGATION: &str = "MEAN";
pub const BEACON_TYPES: &[&str] = &[
    "pageLoad",
    "resourceLoad",
    "httpRequest",
    "error",
    "custom",
    "pageChange",
];
pub const TRAFFIC_TYPES: &[&str] = &["all", "erroneous"];
pub const DURATION_UNITS: &[&str] = &["day", "week"];

const ENTITIES: &[&str] = &["application", "website", "synthetic", "infrastructure"];
const WINDOWS: &[&str] = &["rolling", "fixed"];

const TIME_BASED: &str = "timeBased";
const EVENT_BASED: &str = "eventBased";

/// Indicator block name with the blueprint and measurement type it sends
const INDICATORS: &[(&str, &str, &str)] = &[
    ("time_based_latency", "latency", TIME_BASED),
    ("event_based_latency", "latency", EVENT_BASED),
    ("time_based_availability", "availability", TIME_BASED),
    ("event_based_availability", "availability", EVENT_BASED),
    ("traffic", "traffic", TIME_BASED),
    ("custom", "custom", EVENT_BASED),
    ("saturation", "saturation", TIME_BASED),
];

fn optional_string(name: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::string(name).optional().build()
}

fn filter_attribute() -> tfplug::schema::Attribute {
    tag_filter_attribute(FILTER_EXPRESSION, "Tag filter narrowing the entity")
}

fn one_of_blocks<F>(description: &str, names: &[&str], block: F) -> Block
where
    F: Fn(&str) -> Block,
{
    names
        .iter()
        .fold(BlockBuilder::new().description(description), |builder, name| {
            builder.block(NestedBlock::list(name, block(name)).max_items(1))
        })
        .exactly_one_of(names)
        .build()
}

fn entity_block(name: &str) -> Block {
    let builder = BlockBuilder::new().attribute(filter_attribute());
    match name {
        "application" => builder
            .attribute(string_attribute("application_id", "Id of the application"))
            .attribute(
                AttributeBuilder::string("boundary_scope")
                    .required()
                    .validator(OneOf::new(BOUNDARY_SCOPES.iter().copied()))
                    .build(),
            )
            .attribute(optional_string("service_id"))
            .attribute(optional_string("endpoint_id"))
            .attribute(
                AttributeBuilder::bool("include_internal")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("include_synthetic")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            ),
        "website" => builder
            .attribute(string_attribute("website_id", "Id of the website"))
            .attribute(
                AttributeBuilder::string("beacon_type")
                    .required()
                    .validator(OneOf::new(BEACON_TYPES.iter().copied()))
                    .build(),
            ),
        "synthetic" => builder.attribute(
            AttributeBuilder::string_list("synthetic_test_ids")
                .required()
                .description("Ids of the synthetic tests")
                .build(),
        ),
        _ => builder.attribute(string_attribute("infra_type", "Infrastructure type, e.g. host")),
    }
    .build()
}

fn indicator_block(name: &str) -> Block {
    let threshold = || AttributeBuilder::float("threshold").required().build();
    let aggregation = || {
        AttributeBuilder::string("aggregation")
            .required()
            .validator(OneOf::new(AGGREGATIONS.iter().copied()))
            .build()
    };
    let operator = || {
        AttributeBuilder::string("operator")
            .validator(OneOf::new(THRESHOLD_OPERATORS.iter().copied()))
    };
    let builder = BlockBuilder::new();
    match name {
        "time_based_latency" | "time_based_availability" => {
            builder.attribute(threshold()).attribute(aggregation())
        }
        "event_based_latency" => builder.attribute(threshold()),
        "traffic" => builder
            .attribute(
                AttributeBuilder::string("traffic_type")
                    .required()
                    .validator(OneOf::new(TRAFFIC_TYPES.iter().copied()))
                    .build(),
            )
            .attribute(threshold())
            .attribute(
                operator()
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            ),
        "custom" => builder
            .attribute(tag_filter_attribute(
                "good_event_filter_expression",
                "Tag filter selecting good events",
            ))
            .attribute(tag_filter_attribute(
                "bad_event_filter_expression",
                "Tag filter selecting bad events",
            )),
        "saturation" => builder
            .attribute(string_attribute("metric_name", "Saturation metric"))
            .attribute(threshold())
            .attribute(aggregation())
            .attribute(operator().required().build()),
        _ => builder,
    }
    .build()
}

fn window_block(name: &str) -> Block {
    let builder = BlockBuilder::new()
        .attribute(AttributeBuilder::int("duration").required().build())
        .attribute(
            AttributeBuilder::string("duration_unit")
                .required()
                .validator(OneOf::new(DURATION_UNITS.iter().copied()))
                .build(),
        )
        .attribute(optional_string("timezone"));
    if name == "fixed" {
        builder
            .attribute(
                AttributeBuilder::float("start_timestamp")
                    .required()
                    .description("Start of the window in epoch milliseconds")
                    .build(),
            )
            .build()
    } else {
        builder.build()
    }
}

fn rbac_tags_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("RBAC tag restricting access to the SLO")
        .attribute(string_attribute("display_name", "Display name of the tag"))
        .attribute(string_attribute("id", "Id of the tag"))
        .build();
    NestedBlock::list(RBAC_TAGS, block)
}

fn entity_from_state(root: &BlockReader) -> Result<SloEntity, MappingError> {
    let Some(entity) = root.child(ENTITY) else {
        return Err(MappingError::parse(AttributePath::new(ENTITY), "entity must be set"));
    };
    let (kind, block) = ENTITIES
        .iter()
        .find_map(|kind| entity.child(kind).map(|block| (*kind, block)))
        .ok_or_else(|| {
            MappingError::parse(
                entity.path.clone(),
                format!("one of {} must be set", ENTITIES.join(", ")),
            )
        })?;
    let mut wire = SloEntity {
        entity_type: kind.to_string(),
        tag_filter_expression: Some(
            block
                .tag_filter(FILTER_EXPRESSION)?
                .unwrap_or_else(|| TagFilter::expression("AND", vec![])),
        ),
        ..Default::default()
    };
    match kind {
        "application" => {
            wire.application_id = Some(block.string("application_id")?);
            wire.boundary_scope = Some(block.string("boundary_scope")?);
            wire.service_id = block.optional_string("service_id");
            wire.endpoint_id = block.optional_string("endpoint_id");
            wire.include_internal = Some(block.block.get_bool("include_internal").unwrap_or(false));
            wire.include_synthetic =
                Some(block.block.get_bool("include_synthetic").unwrap_or(false));
        }
        "website" => {
            wire.website_id = Some(block.string("website_id")?);
            wire.beacon_type = Some(block.string("beacon_type")?);
        }
        "synthetic" => {
            let ids = block.block.get_string_list("synthetic_test_ids");
            if ids.is_empty() {
                return Err(MappingError::parse(
                    block.path.clone().attribute("synthetic_test_ids"),
                    "synthetic_test_ids must name at least one test",
                ));
            }
            wire.synthetic_test_ids = Some(ids);
        }
        _ => wire.infra_type = Some(block.string("infra_type")?),
    }
    Ok(wire)
}

fn entity_to_state(state: &Value, entity: &SloEntity) -> Result<Value, MappingError> {
    if !ENTITIES.contains(&entity.entity_type.as_str()) {
        return Err(MappingError::unsupported("SLO entity", entity.entity_type.as_str()));
    }
    let prior = AttributePath::new(ENTITY)
        .index(0)
        .attribute(&entity.entity_type)
        .index(0)
        .attribute(FILTER_EXPRESSION);
    let filter = tag_filter_to_state(
        state.get_path(&prior),
        entity.tag_filter_expression.as_ref(),
    )?;
    let text = |v: &Option<String>| Value::from(v.clone());
    let fields = match entity.entity_type.as_str() {
        "application" => Value::object([
            ("application_id", text(&entity.application_id)),
            ("boundary_scope", text(&entity.boundary_scope)),
            ("service_id", text(&entity.service_id)),
            ("endpoint_id", text(&entity.endpoint_id)),
            ("include_internal", Value::from(entity.include_internal.unwrap_or(false))),
            ("include_synthetic", Value::from(entity.include_synthetic.unwrap_or(false))),
            (FILTER_EXPRESSION, filter),
        ]),
        "website" => Value::object([
            ("website_id", text(&entity.website_id)),
            ("beacon_type", text(&entity.beacon_type)),
            (FILTER_EXPRESSION, filter),
        ]),
        "synthetic" => Value::object([
            (
                "synthetic_test_ids",
                Value::string_list(entity.synthetic_test_ids.clone().unwrap_or_default()),
            ),
            (FILTER_EXPRESSION, filter),
        ]),
        _ => Value::object([
            ("infra_type", text(&entity.infra_type)),
            (FILTER_EXPRESSION, filter),
        ]),
    };
    Ok(single_block(ENTITIES.iter().map(|kind| {
        let value = if *kind == entity.entity_type {
            Value::List(vec![fields.clone()])
        } else {
            Value::Null
        };
        (*kind, value)
    })))
}

fn indicator_from_state(root: &BlockReader) -> Result<SloIndicator, MappingError> {
    let Some(indicator) = root.child(INDICATOR) else {
        return Err(MappingError::parse(AttributePath::new(INDICATOR), "indicator must be set"));
    };
    let ((name, blueprint, measurement), block) = INDICATORS
        .iter()
        .find_map(|entry| indicator.child(entry.0).map(|block| (*entry, block)))
        .ok_or_else(|| MappingError::parse(indicator.path.clone(), "an indicator must be set"))?;
    let mut wire = SloIndicator {
        blueprint: blueprint.to_string(),
        indicator_type: measurement.to_string(),
        aggregation: Some(DEFAULT_AGGREGATION.to_string()),
        ..Default::default()
    };
    match name {
        "time_based_latency" | "time_based_availability" => {
            wire.threshold = Some(block.float("threshold")?);
            wire.aggregation = Some(block.string("aggregation")?);
        }
        "event_based_latency" => wire.threshold = Some(block.float("threshold")?),
        "traffic" => {
            wire.traffic_type = Some(block.string("traffic_type")?);
            wire.threshold = Some(block.float("threshold")?);
            wire.operator = block.optional_string("operator");
        }
        "custom" => {
            wire.good_events_filter = Some(
                block
                    .tag_filter("good_event_filter_expression")?
                    .ok_or_else(|| {
                        MappingError::parse(
                            block.path.clone().attribute("good_event_filter_expression"),
                            "good_event_filter_expression must be set",
                        )
                    })?,
            );
            wire.bad_events_filter = block.tag_filter("bad_event_filter_expression")?;
        }
        "saturation" => {
            wire.metric_name = Some(block.string("metric_name")?);
            wire.threshold = Some(block.float("threshold")?);
            wire.aggregation = Some(block.string("aggregation")?);
            wire.operator = Some(block.string("operator")?);
        }
        _ => {}
    }
    Ok(wire)
}

fn indicator_to_state(state: &Value, indicator: &SloIndicator) -> Result<Value, MappingError> {
    let name = INDICATORS
        .iter()
        .find(|(_, blueprint, measurement)| {
            *blueprint == indicator.blueprint
                && (*blueprint == "traffic" || *measurement == indicator.indicator_type)
        })
        .map(|(name, _, _)| *name)
        .ok_or_else(|| {
            MappingError::unsupported(
                "SLO indicator",
                format!("{}/{}", indicator.blueprint, indicator.indicator_type),
            )
        })?;
    let prior = |field: &str| {
        AttributePath::new(INDICATOR)
            .index(0)
            .attribute(name)
            .index(0)
            .attribute(field)
    };
    let threshold = Value::from(indicator.threshold);
    let text = |v: &Option<String>| Value::from(v.clone());
    let fields = match name {
        "time_based_latency" | "time_based_availability" => Value::object([
            ("threshold", threshold),
            ("aggregation", text(&indicator.aggregation)),
        ]),
        "event_based_latency" => Value::object([("threshold", threshold)]),
        "traffic" => Value::object([
            ("traffic_type", text(&indicator.traffic_type)),
            ("threshold", threshold),
            ("operator", text(&indicator.operator)),
        ]),
        "custom" => Value::object([
            (
                "good_event_filter_expression",
                tag_filter_to_state(
                    state.get_path(&prior("good_event_filter_expression")),
                    indicator.good_events_filter.as_ref(),
                )?,
            ),
            (
                "bad_event_filter_expression",
                tag_filter_to_state(
                    state.get_path(&prior("bad_event_filter_expression")),
                    indicator.bad_events_filter.as_ref(),
                )?,
            ),
        ]),
        "saturation" => Value::object([
            ("metric_name", text(&indicator.metric_name)),
            ("threshold", threshold),
            ("aggregation", text(&indicator.aggregation)),
            ("operator", text(&indicator.operator)),
        ]),
        _ => Value::object(Vec::<(&str, Value)>::new()),
    };
    Ok(single_block(INDICATORS.iter().map(|(candidate, _, _)| {
        let value = if *candidate == name {
            Value::List(vec![fields.clone()])
        } else {
            Value::Null
        };
        (*candidate, value)
    })))
}

fn time_window_from_state(root: &BlockReader) -> Result<SloTimeWindow, MappingError> {
    let Some(window) = root.child(TIME_WINDOW) else {
        return Err(MappingError::parse(AttributePath::new(TIME_WINDOW), "time_window must be set"));
    };
    let (kind, block) = WINDOWS
        .iter()
        .find_map(|kind| window.child(kind).map(|block| (*kind, block)))
        .ok_or_else(|| MappingError::parse(window.path.clone(), "rolling or fixed must be set"))?;
    Ok(SloTimeWindow {
        window_type: kind.to_string(),
        duration: block.int("duration")?,
        duration_unit: block.string("duration_unit")?,
        timezone: block.optional_string("timezone"),
        start_timestamp: if kind == "fixed" {
            Some(block.float("start_timestamp")?)
        } else {
            None
        },
    })
}

fn time_window_to_state(window: &SloTimeWindow) -> Result<Value, MappingError> {
    if !WINDOWS.contains(&window.window_type.as_str()) {
        return Err(MappingError::unsupported("SLO time window", window.window_type.as_str()));
    }
    let mut fields = Value::object([
        ("duration", Value::from(window.duration)),
        ("duration_unit", Value::from(window.duration_unit.as_str())),
        ("timezone", Value::from(window.timezone.clone())),
    ]);
    if window.window_type == "fixed" {
        fields.set("start_timestamp", Value::from(window.start_timestamp));
    }
    Ok(single_block(WINDOWS.iter().map(|kind| {
        let value = if *kind == window.window_type {
            Value::List(vec![fields.clone()])
        } else {
            Value::Null
        };
        (*kind, value)
    })))
}

#[derive(Default)]
pub struct SloConfigResource;

impl ResourceHandle for SloConfigResource {
    type Object = SloConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Service level objective")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the SLO"))
            .attribute(
                AttributeBuilder::float("target")
                    .required()
                    .description("Target ratio of good events, e.g. 0.99")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("tags")
                    .optional()
                    .description("Tags of the SLO")
                    .build(),
            )
            .block(rbac_tags_block())
            .block(
                NestedBlock::list(
                    ENTITY,
                    one_of_blocks("What the SLO is measured on", ENTITIES, entity_block),
                )
                .min_items(1)
                .max_items(1),
            )
            .block(
                NestedBlock::list(
                    INDICATOR,
                    one_of_blocks(
                        "How good and bad are judged",
                        &INDICATORS.iter().map(|(name, _, _)| *name).collect::<Vec<_>>(),
                        indicator_block,
                    ),
                )
                .min_items(1)
                .max_items(1),
            )
            .block(
                NestedBlock::list(
                    TIME_WINDOW,
                    one_of_blocks("Window the target applies to", WINDOWS, window_block),
                )
                .min_items(1)
                .max_items(1),
            )
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema).skip_id_generation()
    }

    fn rest_resource(&self, client: &Client) -> RestResource<SloConfig> {
        client.slo_configs()
    }

    fn set_computed(&self, plan: &mut Value) -> Result<(), MappingError> {
        if plan.get_non_empty_string("id").is_none() {
            plan.set("id", Value::from(format!("{}{}", SLO_ID_PREFIX, generate_id())));
        }
        Ok(())
    }

    fn state_to_object(&self, state: &Value, _prior: &Value) -> Result<SloConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        let rbac_tags = root
            .children(RBAC_TAGS)
            .iter()
            .map(|tag| {
                Ok(RbacTag {
                    display_name: tag.string("display_name")?,
                    id: tag.string("id")?,
                })
            })
            .collect::<Result<Vec<_>, MappingError>>()?;
        Ok(SloConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            target: root.float("target")?,
            tags: state.get_string_list("tags"),
            rbac_tags,
            entity: entity_from_state(&root)?,
            indicator: indicator_from_state(&root)?,
            time_window: time_window_from_state(&root)?,
        })
    }

    fn object_to_state(&self, state: &Value, config: &SloConfig) -> Result<Value, MappingError> {
        let rbac_tags = if config.rbac_tags.is_empty() {
            Value::Null
        } else {
            Value::List(
                config
                    .rbac_tags
                    .iter()
                    .map(|tag| {
                        Value::object([
                            ("display_name", Value::from(tag.display_name.as_str())),
                            ("id", Value::from(tag.id.as_str())),
                        ])
                    })
                    .collect(),
            )
        };
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("target", Value::from(config.target)),
            ("tags", Value::string_set_or_null(config.tags.clone())),
            (RBAC_TAGS, rbac_tags),
            (ENTITY, entity_to_state(state, &config.entity)?),
            (INDICATOR, indicator_to_state(state, &config.indicator)?),
            (TIME_WINDOW, time_window_to_state(&config.time_window)?),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested<const N: usize>(name: &str, fields: [(&str, Value); N]) -> Value {
        single_block([(name, single_block(fields))])
    }

    fn checkout_latency_state() -> Value {
        Value::object([
            ("name", Value::from("checkout latency")),
            ("target", Value::from(0.99)),
            (
                ENTITY,
                nested(
                    "application",
                    [
                        ("application_id", Value::from("app1")),
                        ("boundary_scope", Value::from("INBOUND")),
                    ],
                ),
            ),
            (
                INDICATOR,
                nested(
                    "time_based_latency",
                    [
                        ("threshold", Value::from(250.0)),
                        ("aggregation", Value::from("P90")),
                    ],
                ),
            ),
            (
                TIME_WINDOW,
                nested(
                    "rolling",
                    [
                        ("duration", Value::from(7i64)),
                        ("duration_unit", Value::from("day")),
                    ],
                ),
            ),
        ])
    }

    #[test]
    fn ids_carry_the_provider_prefix() {
        let mut plan = checkout_latency_state();
        plan.set("id", Value::Unknown);
        SloConfigResource.set_computed(&mut plan).unwrap();
        let id = plan.get_string("id").unwrap();
        assert!(id.starts_with(SLO_ID_PREFIX));
        assert!(id.len() > SLO_ID_PREFIX.len());
        assert!(SloConfigResource.metadata().skip_id_generation);
    }

    #[test]
    fn entities_without_a_filter_send_an_empty_expression() {
        let config = SloConfigResource
            .state_to_object(&checkout_latency_state(), &Value::Null)
            .unwrap();
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(
            wire["entity"]["tagFilterExpression"],
            json!({"type": "EXPRESSION", "logicalOperator": "AND"})
        );
        assert_eq!(wire["entity"]["includeInternal"], json!(false));
        assert_eq!(
            wire["indicator"],
            json!({
                "blueprint": "latency",
                "type": "timeBased",
                "threshold": 250.0,
                "aggregation": "P90"
            })
        );

        let state = SloConfigResource.object_to_state(&Value::Null, &config).unwrap();
        let application = state
            .get_block(ENTITY)
            .and_then(|entity| entity.get_block("application"))
            .unwrap();
        assert!(application.get(FILTER_EXPRESSION).is_null());
        assert!(state.get_block(ENTITY).unwrap().get("website").is_null());
    }

    #[test]
    fn custom_indicators_keep_their_filter_spelling() {
        let mut state = checkout_latency_state();
        state.set(
            INDICATOR,
            nested(
                "custom",
                [(
                    "good_event_filter_expression",
                    Value::from(r#"call.http.path@dest equals "/checkout""#),
                )],
            ),
        );
        let handle = SloConfigResource;
        let config = handle.state_to_object(&state, &Value::Null).unwrap();
        assert_eq!(config.indicator.blueprint, "custom");
        assert_eq!(config.indicator.indicator_type, EVENT_BASED);
        assert_eq!(config.indicator.aggregation.as_deref(), Some(DEFAULT_AGGREGATION));

        let read = handle.object_to_state(&state, &config).unwrap();
        let custom = read
            .get_block(INDICATOR)
            .and_then(|indicator| indicator.get_block("custom"))
            .unwrap();
        assert_eq!(
            custom.get_string("good_event_filter_expression").as_deref(),
            Some(r#"call.http.path@dest equals "/checkout""#)
        );
        assert!(custom.get("bad_event_filter_expression").is_null());
    }

    #[test]
    fn fixed_windows_need_a_start() {
        let mut state = checkout_latency_state();
        state.set(
            TIME_WINDOW,
            nested(
                "fixed",
                [
                    ("duration", Value::from(1i64)),
                    ("duration_unit", Value::from("week")),
                ],
            ),
        );
        match SloConfigResource.state_to_object(&state, &Value::Null) {
            Err(MappingError::ParseError { path, .. }) => assert_eq!(
                path,
                AttributePath::new(TIME_WINDOW)
                    .index(0)
                    .attribute("fixed")
                    .index(0)
                    .attribute("start_timestamp")
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_indicator_blueprints_are_unsupported() {
        let mut config = SloConfigResource
            .state_to_object(&checkout_latency_state(), &Value::Null)
            .unwrap();
        config.indicator.blueprint = "throughput".to_string();
        assert!(matches!(
            SloConfigResource.object_to_state(&Value::Null, &config),
            Err(MappingError::UnsupportedVariant { .. })
        ));
    }
}
