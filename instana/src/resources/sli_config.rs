//! instana_sli_config
//!
//! SLI configurations cannot be updated in Instana. Every attribute forces a
//! replacement and the engine rejects updates.

use std::sync::Arc;

use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{Attribute, Block};
use tfplug::validator::{OneOf, StringLength};
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{id_attribute, single_block, tag_filter_attribute, tag_filter_to_state};
use crate::api::models::sli_config::{
    MetricConfiguration, SliEntity, SLI_TYPE_APPLICATION, SLI_TYPE_AVAILABILITY,
    SLI_TYPE_WEBSITE_EVENT_BASED, SLI_TYPE_WEBSITE_TIME_BASED,
};
use crate::api::models::{SliConfig, TagFilter};
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};
use crate::tagfilter;

pub const RESOURCE_NAME: &str = "instana_sli_config";

pub const METRIC_CONFIGURATION: &str = "metric_configuration";
pub const SLI_ENTITY: &str = "sli_entity";

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
    "DISTRIBUTION",
    "DISTINCT_COUNT",
    "SUM_POSITIVE",
    "PER_SECOND",
];
pub const SLI_BOUNDARY_SCOPES: &[&str] = &["ALL", "INBOUND"];
pub const BEACON_TYPES: &[&str] = &[
    "pageLoad",
    "resourceLoad",
    "httpRequest",
    "error",
    "custom",
    "pageChange",
];

/// Entity kinds of the `sli_entity` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    ApplicationTimeBased,
    ApplicationEventBased,
    WebsiteEventBased,
    WebsiteTimeBased,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::ApplicationTimeBased,
        EntityKind::ApplicationEventBased,
        EntityKind::WebsiteEventBased,
        EntityKind::WebsiteTimeBased,
    ];

    pub fn block_name(self) -> &'static str {
        match self {
            EntityKind::ApplicationTimeBased => "application_time_based",
            EntityKind::ApplicationEventBased => "application_event_based",
            EntityKind::WebsiteEventBased => "website_event_based",
            EntityKind::WebsiteTimeBased => "website_time_based",
        }
    }

    pub fn sli_type(self) -> &'static str {
        match self {
            EntityKind::ApplicationTimeBased => SLI_TYPE_APPLICATION,
            EntityKind::ApplicationEventBased => SLI_TYPE_AVAILABILITY,
            EntityKind::WebsiteEventBased => SLI_TYPE_WEBSITE_EVENT_BASED,
            EntityKind::WebsiteTimeBased => SLI_TYPE_WEBSITE_TIME_BASED,
        }
    }

    fn from_sli_type(sli_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.sli_type() == sli_type)
    }

    fn block(self) -> Block {
        let required = |name: &str, description: &str| {
            AttributeBuilder::string(name)
                .required()
                .plan_modifier(RequiresReplace)
                .description(description)
                .build()
        };
        let optional = |name: &str| {
            AttributeBuilder::string(name)
                .optional()
                .plan_modifier(RequiresReplace)
                .build()
        };
        let one_of = |name: &str, allowed: &'static [&'static str]| {
            AttributeBuilder::string(name)
                .required()
                .validator(OneOf::new(allowed.iter().copied()))
                .plan_modifier(RequiresReplace)
                .build()
        };
        let flag = |name: &str| {
            AttributeBuilder::bool(name)
                .optional()
                .plan_modifier(RequiresReplace)
                .build()
        };
        let filter = |name: &str, description: &str| {
            replacing(tag_filter_attribute(name, description))
        };
        let builder = BlockBuilder::new();
        match self {
            EntityKind::ApplicationTimeBased => builder
                .attribute(required("application_id", "Id of the application"))
                .attribute(optional("service_id"))
                .attribute(optional("endpoint_id"))
                .attribute(one_of("boundary_scope", SLI_BOUNDARY_SCOPES)),
            EntityKind::ApplicationEventBased => builder
                .attribute(required("application_id", "Id of the application"))
                .attribute(one_of("boundary_scope", SLI_BOUNDARY_SCOPES))
                .attribute(filter("bad_event_filter_expression", "Tag filter matching bad calls"))
                .attribute(filter("good_event_filter_expression", "Tag filter matching good calls"))
                .attribute(flag("include_internal"))
                .attribute(flag("include_synthetic")),
            EntityKind::WebsiteEventBased => builder
                .attribute(required("website_id", "Id of the website"))
                .attribute(filter("bad_event_filter_expression", "Tag filter matching bad beacons"))
                .attribute(filter(
                    "good_event_filter_expression",
                    "Tag filter matching good beacons",
                ))
                .attribute(one_of("beacon_type", BEACON_TYPES)),
            EntityKind::WebsiteTimeBased => builder
                .attribute(required("website_id", "Id of the website"))
                .attribute(filter("filter_expression", "Tag filter matching the beacons"))
                .attribute(one_of("beacon_type", BEACON_TYPES)),
        }
        .build()
    }
}

fn replacing(mut attribute: Attribute) -> Attribute {
    attribute.plan_modifiers.push(Arc::new(RequiresReplace));
    attribute
}

fn metric_configuration_block() -> Block {
    BlockBuilder::new()
        .description("Metric the SLI is computed from")
        .attribute(
            AttributeBuilder::string("metric_name")
                .required()
                .plan_modifier(RequiresReplace)
                .build(),
        )
        .attribute(
            AttributeBuilder::string("aggregation")
                .required()
                .validator(OneOf::new(AGGREGATIONS.iter().copied()))
                .plan_modifier(RequiresReplace)
                .build(),
        )
        .attribute(
            AttributeBuilder::float("threshold")
                .required()
                .plan_modifier(RequiresReplace)
                .description("Threshold of the metric, greater than zero")
                .build(),
        )
        .build()
}

fn sli_entity_block() -> Block {
    EntityKind::ALL
        .into_iter()
        .fold(
            BlockBuilder::new().description("Entity the SLI is measured on"),
            |builder, kind| {
                builder.block(NestedBlock::list(kind.block_name(), kind.block()).max_items(1))
            },
        )
        .build()
}

#[derive(Default)]
pub struct SliConfigResource;

fn entity_filter(
    entity: &Value,
    path: &AttributePath,
    name: &str,
) -> Result<Option<TagFilter>, MappingError> {
    tagfilter::wire_from_text(entity.get_string(name).as_deref())
        .map_err(|e| MappingError::tag_filter(path.clone().attribute(name), e))
}

fn required_entity_string(
    entity: &Value,
    path: &AttributePath,
    name: &str,
) -> Result<String, MappingError> {
    entity.get_non_empty_string(name).ok_or_else(|| {
        MappingError::parse(path.clone().attribute(name), format!("{} must be set", name))
    })
}

fn entity_from_state(state: &Value) -> Result<SliEntity, MappingError> {
    let block = state
        .get_block(SLI_ENTITY)
        .ok_or_else(|| MappingError::missing(SLI_ENTITY))?;
    let mut populated = EntityKind::ALL
        .into_iter()
        .filter_map(|kind| block.get_block(kind.block_name()).map(|entity| (kind, entity)));
    let (kind, entity) = match (populated.next(), populated.next()) {
        (Some(found), None) => found,
        _ => {
            return Err(MappingError::parse(
                AttributePath::new(SLI_ENTITY),
                "exactly one entity kind must be configured",
            ))
        }
    };
    let path = AttributePath::new(SLI_ENTITY)
        .index(0)
        .attribute(kind.block_name())
        .index(0);
    let text = |name: &str| required_entity_string(entity, &path, name);
    let mut sli_entity = SliEntity {
        sli_type: kind.sli_type().to_string(),
        ..Default::default()
    };
    match kind {
        EntityKind::ApplicationTimeBased => {
            sli_entity.application_id = Some(text("application_id")?);
            sli_entity.service_id = entity.get_non_empty_string("service_id");
            sli_entity.endpoint_id = entity.get_non_empty_string("endpoint_id");
            sli_entity.boundary_scope = Some(text("boundary_scope")?);
        }
        EntityKind::ApplicationEventBased => {
            sli_entity.application_id = Some(text("application_id")?);
            sli_entity.boundary_scope = Some(text("boundary_scope")?);
            sli_entity.bad_event_filter_expression =
                entity_filter(entity, &path, "bad_event_filter_expression")?;
            sli_entity.good_event_filter_expression =
                entity_filter(entity, &path, "good_event_filter_expression")?;
            sli_entity.include_internal = entity.get_bool("include_internal");
            sli_entity.include_synthetic = entity.get_bool("include_synthetic");
        }
        EntityKind::WebsiteEventBased => {
            sli_entity.website_id = Some(text("website_id")?);
            sli_entity.bad_event_filter_expression =
                entity_filter(entity, &path, "bad_event_filter_expression")?;
            sli_entity.good_event_filter_expression =
                entity_filter(entity, &path, "good_event_filter_expression")?;
            sli_entity.beacon_type = Some(text("beacon_type")?);
        }
        EntityKind::WebsiteTimeBased => {
            sli_entity.website_id = Some(text("website_id")?);
            sli_entity.filter_expression = entity_filter(entity, &path, "filter_expression")?;
            sli_entity.beacon_type = Some(text("beacon_type")?);
        }
    }
    Ok(sli_entity)
}

/// `state` is the tree the entity was built from; its filter spellings are
/// kept while equivalent
fn entity_to_state(state: &Value, entity: &SliEntity) -> Result<Value, MappingError> {
    let kind = EntityKind::from_sli_type(&entity.sli_type)
        .ok_or_else(|| MappingError::unsupported("sli entity type", entity.sli_type.as_str()))?;
    let prior = state
        .get_block(SLI_ENTITY)
        .and_then(|block| block.get_block(kind.block_name()))
        .unwrap_or(&Value::Null);
    let filter = |name: &str, wire: &Option<TagFilter>| {
        tag_filter_to_state(prior.get(name), wire.as_ref())
    };
    let s = |v: &Option<String>| Value::from(v.clone());
    let fields: Vec<(&str, Value)> = match kind {
        EntityKind::ApplicationTimeBased => vec![
            ("application_id", s(&entity.application_id)),
            ("service_id", s(&entity.service_id)),
            ("endpoint_id", s(&entity.endpoint_id)),
            ("boundary_scope", s(&entity.boundary_scope)),
        ],
        EntityKind::ApplicationEventBased => vec![
            ("application_id", s(&entity.application_id)),
            ("boundary_scope", s(&entity.boundary_scope)),
            (
                "bad_event_filter_expression",
                filter("bad_event_filter_expression", &entity.bad_event_filter_expression)?,
            ),
            (
                "good_event_filter_expression",
                filter("good_event_filter_expression", &entity.good_event_filter_expression)?,
            ),
            ("include_internal", Value::from(entity.include_internal)),
            ("include_synthetic", Value::from(entity.include_synthetic)),
        ],
        EntityKind::WebsiteEventBased => vec![
            ("website_id", s(&entity.website_id)),
            (
                "bad_event_filter_expression",
                filter("bad_event_filter_expression", &entity.bad_event_filter_expression)?,
            ),
            (
                "good_event_filter_expression",
                filter("good_event_filter_expression", &entity.good_event_filter_expression)?,
            ),
            ("beacon_type", s(&entity.beacon_type)),
        ],
        EntityKind::WebsiteTimeBased => vec![
            ("website_id", s(&entity.website_id)),
            ("filter_expression", filter("filter_expression", &entity.filter_expression)?),
            ("beacon_type", s(&entity.beacon_type)),
        ],
    };
    let populated = single_block(fields);
    Ok(single_block(EntityKind::ALL.into_iter().map(|k| {
        let value = if k == kind { populated.clone() } else { Value::Null };
        (k.block_name(), value)
    })))
}

fn metric_configuration_from_state(
    state: &Value,
) -> Result<Option<MetricConfiguration>, MappingError> {
    let Some(block) = state.get_block(METRIC_CONFIGURATION) else {
        return Ok(None);
    };
    let path = AttributePath::new(METRIC_CONFIGURATION).index(0);
    let threshold = block.get_f64("threshold").unwrap_or_default();
    if threshold <= 0.0 {
        return Err(MappingError::parse(
            path.attribute("threshold"),
            "threshold must be greater than zero",
        ));
    }
    Ok(Some(MetricConfiguration {
        metric_name: required_entity_string(block, &path, "metric_name")?,
        aggregation: required_entity_string(block, &path, "aggregation")?,
        threshold,
    }))
}

impl ResourceHandle for SliConfigResource {
    type Object = SliConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("Service level indicator measured on an application or website")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .validator(StringLength::between(0, 256))
                    .plan_modifier(RequiresReplace)
                    .description("Name of the SLI")
                    .build(),
            )
            .attribute(
                AttributeBuilder::int("initial_evaluation_timestamp")
                    .optional()
                    .plan_modifier(RequiresReplace)
                    .description("Epoch milliseconds of the first evaluation")
                    .build(),
            )
            .block(
                NestedBlock::list(METRIC_CONFIGURATION, metric_configuration_block()).max_items(1),
            )
            .block(
                NestedBlock::list(SLI_ENTITY, sli_entity_block())
                    .min_items(1)
                    .max_items(1),
            )
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema).create_only()
    }

    fn rest_resource(&self, client: &Client) -> RestResource<SliConfig> {
        client.sli_configs()
    }

    fn state_to_object(&self, state: &Value, _prior: &Value) -> Result<SliConfig, MappingError> {
        Ok(SliConfig {
            id: state.get_string("id").unwrap_or_default(),
            sli_name: required_string(state, "name")?,
            initial_evaluation_timestamp: state.get_i64("initial_evaluation_timestamp"),
            metric_configuration: metric_configuration_from_state(state)?,
            sli_entity: entity_from_state(state)?,
        })
    }

    fn object_to_state(&self, state: &Value, sli: &SliConfig) -> Result<Value, MappingError> {
        let metric_configuration = match &sli.metric_configuration {
            Some(m) => single_block([
                ("metric_name", Value::from(m.metric_name.as_str())),
                ("aggregation", Value::from(m.aggregation.as_str())),
                ("threshold", Value::from(m.threshold)),
            ]),
            None => Value::Null,
        };
        Ok(Value::object([
            ("id", Value::from(sli.id.as_str())),
            ("name", Value::from(sli.sli_name.as_str())),
            (
                "initial_evaluation_timestamp",
                Value::from(sli.initial_evaluation_timestamp),
            ),
            (METRIC_CONFIGURATION, metric_configuration),
            (SLI_ENTITY, entity_to_state(state, &sli.sli_entity)?),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sli_state(entity_kind: EntityKind, entity: Value) -> Value {
        let entities = single_block(EntityKind::ALL.into_iter().map(|k| {
            let value = if k == entity_kind {
                Value::List(vec![entity.clone()])
            } else {
                Value::Null
            };
            (k.block_name(), value)
        }));
        Value::object([
            ("id", Value::from("sli1")),
            ("name", Value::from("checkout latency")),
            ("initial_evaluation_timestamp", Value::Null),
            (
                METRIC_CONFIGURATION,
                single_block([
                    ("metric_name", Value::from("latency")),
                    ("aggregation", Value::from("P95")),
                    ("threshold", Value::from(250.0)),
                ]),
            ),
            (SLI_ENTITY, entities),
        ])
    }

    fn time_based_entity() -> Value {
        Value::object([
            ("application_id", Value::from("app1")),
            ("service_id", Value::Null),
            ("endpoint_id", Value::from("ep1")),
            ("boundary_scope", Value::from("INBOUND")),
        ])
    }

    #[test]
    fn resource_is_create_only() {
        assert!(SliConfigResource.metadata().create_only);
    }

    #[test]
    fn application_entity_maps_to_application_type() {
        let state = sli_state(EntityKind::ApplicationTimeBased, time_based_entity());
        let sli = SliConfigResource
            .state_to_object(&state, &Value::Null)
            .unwrap();
        assert_eq!(sli.sli_entity.sli_type, "application");
        assert_eq!(sli.sli_entity.endpoint_id.as_deref(), Some("ep1"));

        let back = SliConfigResource.object_to_state(&state, &sli).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn website_filters_keep_the_planned_spelling() {
        let entity = Value::object([
            ("website_id", Value::from("web1")),
            ("filter_expression", Value::from("beacon.page.name equals 'home'")),
            ("beacon_type", Value::from("pageLoad")),
        ]);
        let state = sli_state(EntityKind::WebsiteTimeBased, entity);
        let sli = SliConfigResource
            .state_to_object(&state, &Value::Null)
            .unwrap();
        assert_eq!(sli.sli_entity.sli_type, "websiteTimeBased");

        let back = SliConfigResource.object_to_state(&state, &sli).unwrap();
        assert_eq!(back, state);

        let imported = SliConfigResource.object_to_state(&Value::Null, &sli).unwrap();
        let entity = imported
            .get_block(SLI_ENTITY)
            .and_then(|b| b.get_block("website_time_based"))
            .unwrap();
        assert_eq!(
            entity.get_string("filter_expression").as_deref(),
            Some("beacon.page.name EQUALS 'home'")
        );
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        let mut state = sli_state(EntityKind::ApplicationTimeBased, time_based_entity());
        state.set(
            METRIC_CONFIGURATION,
            single_block([
                ("metric_name", Value::from("latency")),
                ("aggregation", Value::from("P95")),
                ("threshold", Value::from(0.0)),
            ]),
        );
        match SliConfigResource.state_to_object(&state, &Value::Null) {
            Err(MappingError::ParseError { path, .. }) => assert_eq!(
                path,
                AttributePath::new(METRIC_CONFIGURATION).index(0).attribute("threshold")
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_entity_type_is_unsupported() {
        let sli = SliConfig {
            sli_name: "x".to_string(),
            sli_entity: SliEntity {
                sli_type: "mobileApp".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            SliConfigResource.object_to_state(&Value::Null, &sli),
            Err(MappingError::unsupported("sli entity type", "mobileApp"))
        );
    }
}
