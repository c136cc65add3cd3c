//! instana_application_alert_config and instana_global_application_alert_config
//!
//! Both share one schema; the global variant lives in its own collection and
//! may span every application.

use std::collections::BTreeMap;
use tfplug::defaults::StaticDefault;
use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::alerts::{
    alert_channel_ids_attribute, alert_channels_from_state, alert_channels_schema_block,
    alert_channels_to_state, description_attribute, grace_period_attribute, granularity_attribute,
    granularity_from_state, name_attribute, rule_from_shapes, rule_shapes_block, rule_to_shapes,
    rules_from_state, rules_schema_block, rules_to_state, severity_attribute, severity_from_state,
    severity_to_state, triggering_attribute, RuleField, RuleShape, ALERT_CHANNELS,
    ALERT_CHANNEL_IDS, GRANULARITY, RULES,
};
use super::threshold::{
    time_threshold_from_state, time_threshold_schema_block, time_threshold_to_state,
    TimeThresholdKind, TIME_THRESHOLD,
};
use super::{
    id_attribute, tag_filter_attribute, tag_filter_from_state, tag_filter_to_state, BlockReader,
};
use crate::api::models::alert_config::{IncludedApplication, IncludedEndpoint, IncludedService};
use crate::api::models::application_config::BOUNDARY_SCOPES;
use crate::api::models::ApplicationAlertConfig;
use crate::api::{Client, RestResource};
use crate::payload;
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_application_alert_config";
pub const GLOBAL_RESOURCE_NAME: &str = "instana_global_application_alert_config";

pub const APPLICATION: &str = "application";
pub const EVALUATION_TYPES: &[&str] = &["PER_AP", "PER_AP_SERVICE", "PER_AP_ENDPOINT"];

const METRIC: &[RuleField] = &[RuleField::MetricName, RuleField::Aggregation];

pub const RULE_SHAPES: &[RuleShape] = &[
    RuleShape {
        name: "error_rate",
        alert_type: "errorRate",
        fields: METRIC,
    },
    RuleShape {
        name: "errors",
        alert_type: "errors",
        fields: METRIC,
    },
    RuleShape {
        name: "logs",
        alert_type: "logs",
        fields: &[
            RuleField::MetricName,
            RuleField::Aggregation,
            RuleField::Level,
            RuleField::Message,
            RuleField::Operator,
        ],
    },
    RuleShape {
        name: "slowness",
        alert_type: "slowness",
        fields: METRIC,
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
    RuleShape {
        name: "throughput",
        alert_type: "throughput",
        fields: METRIC,
    },
];

const TIME_THRESHOLD_KINDS: &[TimeThresholdKind] = &TimeThresholdKind::ALL;

/// `GLOBAL` selects the global collection
#[derive(Default)]
pub struct ApplicationAlertHandle<const GLOBAL: bool>;

pub type ApplicationAlertConfigResource = ApplicationAlertHandle<false>;
pub type GlobalApplicationAlertConfigResource = ApplicationAlertHandle<true>;

fn inclusive() -> tfplug::schema::Attribute {
    AttributeBuilder::bool("inclusive")
        .required()
        .description("Whether the entity is included or excluded")
        .build()
}

fn application_block() -> Block {
    let endpoint = BlockBuilder::new()
        .attribute(AttributeBuilder::string("endpoint_id").required().build())
        .attribute(inclusive())
        .build();
    let service = BlockBuilder::new()
        .attribute(AttributeBuilder::string("service_id").required().build())
        .attribute(inclusive())
        .block(NestedBlock::set("endpoint", endpoint))
        .build();
    BlockBuilder::new()
        .description("Application, and optionally services and endpoints, the alert covers")
        .attribute(AttributeBuilder::string("application_id").required().build())
        .attribute(inclusive())
        .block(NestedBlock::set("service", service))
        .build()
}

fn inclusive_flag(reader: &BlockReader) -> Result<bool, MappingError> {
    reader.block.get_bool("inclusive").ok_or_else(|| {
        MappingError::parse(reader.path.clone().attribute("inclusive"), "inclusive must be set")
    })
}

fn applications_from_state(
    state: &BlockReader,
) -> Result<BTreeMap<String, IncludedApplication>, MappingError> {
    let mut applications = BTreeMap::new();
    for app in state.children(APPLICATION) {
        let mut services = BTreeMap::new();
        for service in app.children("service") {
            let mut endpoints = BTreeMap::new();
            for endpoint in service.children("endpoint") {
                let endpoint_id = endpoint.string("endpoint_id")?;
                endpoints.insert(
                    endpoint_id.clone(),
                    IncludedEndpoint {
                        endpoint_id,
                        inclusive: inclusive_flag(&endpoint)?,
                    },
                );
            }
            let service_id = service.string("service_id")?;
            services.insert(
                service_id.clone(),
                IncludedService {
                    service_id,
                    inclusive: inclusive_flag(&service)?,
                    endpoints,
                },
            );
        }
        let application_id = app.string("application_id")?;
        applications.insert(
            application_id.clone(),
            IncludedApplication {
                application_id,
                inclusive: inclusive_flag(&app)?,
                services,
            },
        );
    }
    Ok(applications)
}

fn applications_to_state(applications: &BTreeMap<String, IncludedApplication>) -> Value {
    if applications.is_empty() {
        return Value::Null;
    }
    let set_or_null = |items: Vec<Value>| {
        if items.is_empty() {
            Value::Null
        } else {
            Value::Set(items)
        }
    };
    set_or_null(
        applications
            .values()
            .map(|app| {
                let services = app
                    .services
                    .values()
                    .map(|service| {
                        let endpoints = service
                            .endpoints
                            .values()
                            .map(|endpoint| {
                                Value::object([
                                    ("endpoint_id", Value::from(endpoint.endpoint_id.as_str())),
                                    ("inclusive", Value::from(endpoint.inclusive)),
                                ])
                            })
                            .collect();
                        Value::object([
                            ("service_id", Value::from(service.service_id.as_str())),
                            ("inclusive", Value::from(service.inclusive)),
                            ("endpoint", set_or_null(endpoints)),
                        ])
                    })
                    .collect();
                Value::object([
                    ("application_id", Value::from(app.application_id.as_str())),
                    ("inclusive", Value::from(app.inclusive)),
                    ("service", set_or_null(services)),
                ])
            })
            .collect(),
    )
}

fn bool_attribute(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::bool(name)
        .optional()
        .computed()
        .default(StaticDefault::bool(false))
        .description(description)
        .build()
}

impl<const GLOBAL: bool> ResourceHandle for ApplicationAlertHandle<GLOBAL> {
    type Object = ApplicationAlertConfig;

    fn metadata(&self) -> ResourceMetaData {
        let (name, description) = if GLOBAL {
            (GLOBAL_RESOURCE_NAME, "Alert across applications")
        } else {
            (RESOURCE_NAME, "Alert on the calls of applications, services or endpoints")
        };
        let schema = SchemaBuilder::new()
            .version(0)
            .description(description)
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute(true))
            .attribute(severity_attribute())
            .attribute(triggering_attribute())
            .attribute(
                AttributeBuilder::string("boundary_scope")
                    .required()
                    .validator(OneOf::new(BOUNDARY_SCOPES.iter().copied()))
                    .description("Which calls of the applications are evaluated")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("evaluation_type")
                    .required()
                    .validator(OneOf::new(EVALUATION_TYPES.iter().copied()))
                    .description("Whether the rules apply per application, service or endpoint")
                    .build(),
            )
            .attribute(bool_attribute("include_internal", "Include internal calls"))
            .attribute(bool_attribute("include_synthetic", "Include synthetic calls"))
            .attribute(tag_filter_attribute("tag_filter", "Tag filter limiting the calls"))
            .attribute(alert_channel_ids_attribute())
            .attribute(granularity_attribute())
            .attribute(grace_period_attribute())
            .block(alert_channels_schema_block())
            .block(NestedBlock::set(APPLICATION, application_block()).min_items(1))
            .block(rules_schema_block(rule_shapes_block(RULE_SHAPES)))
            .block(time_threshold_schema_block(TIME_THRESHOLD_KINDS))
            .block(payload::schema_block())
            .build();
        ResourceMetaData::new(name, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<ApplicationAlertConfig> {
        client.application_alert_configs(GLOBAL)
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<ApplicationAlertConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        Ok(ApplicationAlertConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: required_string(state, "description")?,
            severity: severity_from_state(state)?,
            triggering: state.get_bool("triggering").unwrap_or(false),
            applications: applications_from_state(&root)?,
            boundary_scope: required_string(state, "boundary_scope")?,
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            include_internal: state.get_bool("include_internal").unwrap_or(false),
            include_synthetic: state.get_bool("include_synthetic").unwrap_or(false),
            evaluation_type: required_string(state, "evaluation_type")?,
            alert_channel_ids: state.get_string_list(ALERT_CHANNEL_IDS),
            alert_channels: alert_channels_from_state(state),
            granularity: granularity_from_state(state),
            grace_period: state.get_i64("grace_period"),
            custom_payload_fields: payload::fields_from_state(state)?,
            rules: rules_from_state(&root, |rule| rule_from_shapes(rule, RULE_SHAPES))?,
            time_threshold: time_threshold_from_state(&root, TIME_THRESHOLD_KINDS)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &ApplicationAlertConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            ("severity", severity_to_state(config.severity)?),
            ("triggering", Value::from(config.triggering)),
            (APPLICATION, applications_to_state(&config.applications)),
            ("boundary_scope", Value::from(config.boundary_scope.as_str())),
            (
                "tag_filter",
                tag_filter_to_state(
                    state.get("tag_filter"),
                    config.tag_filter_expression.as_ref(),
                )?,
            ),
            ("include_internal", Value::from(config.include_internal)),
            ("include_synthetic", Value::from(config.include_synthetic)),
            ("evaluation_type", Value::from(config.evaluation_type.as_str())),
            (
                ALERT_CHANNEL_IDS,
                Value::string_set_or_null(config.alert_channel_ids.clone()),
            ),
            (ALERT_CHANNELS, alert_channels_to_state(&config.alert_channels)),
            (GRANULARITY, Value::from(config.granularity)),
            ("grace_period", Value::from(config.grace_period)),
            (
                payload::CUSTOM_PAYLOAD_FIELD,
                payload::fields_to_state(&config.custom_payload_fields),
            ),
            (
                RULES,
                rules_to_state(&config.rules, |rule| rule_to_shapes(rule, RULE_SHAPES))?,
            ),
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
    use crate::api::models::alert_config::{ThresholdRule, TimeThreshold};
    use crate::resources::single_block;
    use serde_json::json;

    fn alert_state() -> Value {
        Value::object([
            ("id", Value::from("alert-1")),
            ("name", Value::from("checkout errors")),
            ("description", Value::from("too many errors")),
            ("severity", Value::Null),
            ("triggering", Value::from(false)),
            ("boundary_scope", Value::from("INBOUND")),
            ("evaluation_type", Value::from("PER_AP_SERVICE")),
            ("include_internal", Value::from(false)),
            ("include_synthetic", Value::from(true)),
            ("tag_filter", Value::from("call.type EQUALS 'HTTP'")),
            ("alert_channel_ids", Value::string_set(["ch1"])),
            ("alert_channels", Value::Null),
            ("granularity", Value::from(600000i64)),
            ("grace_period", Value::Null),
            (payload::CUSTOM_PAYLOAD_FIELD, Value::Null),
            (
                APPLICATION,
                Value::Set(vec![Value::object([
                    ("application_id", Value::from("app1")),
                    ("inclusive", Value::from(true)),
                    (
                        "service",
                        Value::Set(vec![Value::object([
                            ("service_id", Value::from("svc1")),
                            ("inclusive", Value::from(true)),
                            ("endpoint", Value::Null),
                        ])]),
                    ),
                ])]),
            ),
            (
                RULES,
                Value::List(vec![Value::object([
                    (
                        "rule",
                        Value::List(vec![Value::object([
                            (
                                "error_rate",
                                single_block([
                                    ("metric_name", Value::from("errors")),
                                    ("aggregation", Value::from("MEAN")),
                                ]),
                            ),
                            ("errors", Value::Null),
                            ("logs", Value::Null),
                            ("slowness", Value::Null),
                            ("status_code", Value::Null),
                            ("throughput", Value::Null),
                        ])]),
                    ),
                    ("threshold_operator", Value::from(">=")),
                    (
                        "threshold",
                        single_block([
                            (
                                "warning",
                                Value::List(vec![Value::object([
                                    ("static", single_block([("value", Value::from(0.25))])),
                                    ("adaptive_baseline", Value::Null),
                                    ("historic_baseline", Value::Null),
                                ])]),
                            ),
                            ("critical", Value::Null),
                        ]),
                    ),
                ])]),
            ),
            (
                TIME_THRESHOLD,
                single_block([
                    ("request_impact", Value::Null),
                    ("violations_in_period", Value::Null),
                    (
                        "violations_in_sequence",
                        single_block([
                            ("time_window", Value::from(600000i64)),
                            ("violations_count", Value::Null),
                        ]),
                    ),
                    ("user_impact_of_violations_in_sequence", Value::Null),
                ]),
            ),
        ])
    }

    #[test]
    fn rules_travel_with_severity_keyed_thresholds() {
        let config = ApplicationAlertConfigResource::default()
            .state_to_object(&alert_state(), &Value::Null)
            .unwrap();
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(
            wire["rules"],
            json!([{
                "rule": {"alertType": "errorRate", "metricName": "errors", "aggregation": "MEAN"},
                "thresholdOperator": ">=",
                "thresholds": {"WARNING": {"type": "staticThreshold", "value": 0.25}}
            }])
        );
        assert_eq!(
            wire["timeThreshold"],
            json!({"type": "violationsInSequence", "timeWindow": 600000})
        );
        assert_eq!(wire["applications"]["app1"]["services"]["svc1"]["inclusive"], json!(true));
    }

    #[test]
    fn unchanged_alert_reads_back_as_configured() {
        let handle = ApplicationAlertConfigResource::default();
        let state = alert_state();
        let config = handle.state_to_object(&state, &Value::Null).unwrap();
        assert_eq!(handle.object_to_state(&state, &config).unwrap(), state);
    }

    #[test]
    fn platform_time_thresholds_map_back() {
        let mut config = ApplicationAlertConfigResource::default()
            .state_to_object(&alert_state(), &Value::Null)
            .unwrap();
        config.time_threshold = Some(TimeThreshold::RequestImpact {
            time_window: 300000,
            requests: 50,
        });
        config.rules[0].thresholds.insert(
            "CRITICAL".to_string(),
            ThresholdRule::AdaptiveBaseline {
                operator: None,
                deviation_factor: 2.5,
                adaptability: 0.7,
                seasonality: "DAILY".to_string(),
            },
        );
        let state = ApplicationAlertConfigResource::default()
            .object_to_state(&alert_state(), &config)
            .unwrap();
        let impact = state
            .get_block(TIME_THRESHOLD)
            .and_then(|t| t.get_block("request_impact"))
            .unwrap();
        assert_eq!(impact.get_i64("requests"), Some(50));
        let critical = state.get_blocks(RULES)[0]
            .get_block("threshold")
            .and_then(|t| t.get_block("critical"))
            .and_then(|c| c.get_block("adaptive_baseline"))
            .unwrap();
        assert_eq!(critical.get_string("seasonality").as_deref(), Some("DAILY"));
    }

    #[test]
    fn global_configs_use_their_own_collection() {
        let client = Client::new("https://tenant.instana.io", "token", false).unwrap();
        assert_eq!(
            GlobalApplicationAlertConfigResource::default().metadata().resource_name,
            GLOBAL_RESOURCE_NAME
        );
        assert_eq!(
            GlobalApplicationAlertConfigResource::default()
                .rest_resource(&client)
                .path(),
            crate::api::GLOBAL_APPLICATION_ALERT_CONFIGS_PATH
        );
        assert_eq!(
            ApplicationAlertConfigResource::default()
                .rest_resource(&client)
                .path(),
            crate::api::APPLICATION_ALERT_CONFIGS_PATH
        );
    }

    #[test]
    fn application_without_inclusive_flag_is_rejected() {
        let mut state = alert_state();
        state.set(
            APPLICATION,
            Value::Set(vec![Value::object([("application_id", Value::from("app1"))])]),
        );
        match ApplicationAlertConfigResource::default().state_to_object(&state, &Value::Null) {
            Err(MappingError::ParseError { path, .. }) => assert_eq!(
                path,
                AttributePath::new(APPLICATION).index(0).attribute("inclusive")
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
