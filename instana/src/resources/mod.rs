//! Resource implementations

pub mod alerting_channel;
pub mod alerting_config;
pub mod alerts;
pub mod api_token;
pub mod application_alert_config;
pub mod application_config;
pub mod automation_action;
pub mod automation_policy;
pub mod custom_dashboard;
pub mod custom_event_specification;
pub mod infra_alert_config;
pub mod log_alert_config;
pub mod mobile_alert_config;
pub mod rbac_group;
pub mod sli_config;
pub mod slo_alert_config;
pub mod slo_config;
pub mod slo_correction_config;
pub mod synthetic_alert_config;
pub mod threshold;
pub mod website_alert_config;
pub mod website_monitoring_config;

pub use alerting_channel::AlertingChannelResource;
pub use alerting_config::AlertingConfigResource;
pub use api_token::ApiTokenResource;
pub use application_alert_config::{
    ApplicationAlertConfigResource, GlobalApplicationAlertConfigResource,
};
pub use application_config::ApplicationConfigResource;
pub use automation_action::AutomationActionResource;
pub use automation_policy::AutomationPolicyResource;
pub use custom_dashboard::CustomDashboardResource;
pub use custom_event_specification::CustomEventSpecificationResource;
pub use infra_alert_config::InfraAlertConfigResource;
pub use log_alert_config::LogAlertConfigResource;
pub use mobile_alert_config::MobileAlertConfigResource;
pub use rbac_group::RbacGroupResource;
pub use sli_config::SliConfigResource;
pub use slo_alert_config::SloAlertConfigResource;
pub use slo_config::SloConfigResource;
pub use slo_correction_config::SloCorrectionConfigResource;
pub use synthetic_alert_config::SyntheticAlertConfigResource;
pub use website_alert_config::WebsiteAlertConfigResource;
pub use website_monitoring_config::WebsiteMonitoringConfigResource;

use std::collections::HashMap;
use tfplug::plan_modifier::{
    PlanModifier, PlanModifyRequest, PlanModifyResponse, UseStateForUnknown,
};
use tfplug::schema::{Attribute, Block};
use tfplug::validator::OneOf;
use tfplug::{
    AttributeBuilder, AttributePath, BlockBuilder, Diagnostics, NestedBlock, ResourceFactory, Value,
};

use crate::api::models::application_config::{ACCESS_TYPES, RELATION_TYPES};
use crate::api::models::{AccessRule, TagFilter};
use crate::resourcehandle::{HandleResource, MappingError};
use crate::tagfilter;

/// Factories of every managed resource keyed by type name
pub fn factories() -> HashMap<String, ResourceFactory> {
    HashMap::from([
        (
            alerting_channel::RESOURCE_NAME.to_string(),
            HandleResource::<AlertingChannelResource>::factory(),
        ),
        (
            alerting_config::RESOURCE_NAME.to_string(),
            HandleResource::<AlertingConfigResource>::factory(),
        ),
        (
            api_token::RESOURCE_NAME.to_string(),
            HandleResource::<ApiTokenResource>::factory(),
        ),
        (
            application_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<ApplicationAlertConfigResource>::factory(),
        ),
        (
            application_alert_config::GLOBAL_RESOURCE_NAME.to_string(),
            HandleResource::<GlobalApplicationAlertConfigResource>::factory(),
        ),
        (
            application_config::RESOURCE_NAME.to_string(),
            HandleResource::<ApplicationConfigResource>::factory(),
        ),
        (
            automation_action::RESOURCE_NAME.to_string(),
            HandleResource::<AutomationActionResource>::factory(),
        ),
        (
            automation_policy::RESOURCE_NAME.to_string(),
            HandleResource::<AutomationPolicyResource>::factory(),
        ),
        (
            custom_dashboard::RESOURCE_NAME.to_string(),
            HandleResource::<CustomDashboardResource>::factory(),
        ),
        (
            custom_event_specification::RESOURCE_NAME.to_string(),
            HandleResource::<CustomEventSpecificationResource>::factory(),
        ),
        (
            infra_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<InfraAlertConfigResource>::factory(),
        ),
        (
            log_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<LogAlertConfigResource>::factory(),
        ),
        (
            mobile_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<MobileAlertConfigResource>::factory(),
        ),
        (
            rbac_group::RESOURCE_NAME.to_string(),
            HandleResource::<RbacGroupResource>::factory(),
        ),
        (
            sli_config::RESOURCE_NAME.to_string(),
            HandleResource::<SliConfigResource>::factory(),
        ),
        (
            slo_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<SloAlertConfigResource>::factory(),
        ),
        (
            slo_config::RESOURCE_NAME.to_string(),
            HandleResource::<SloConfigResource>::factory(),
        ),
        (
            slo_correction_config::RESOURCE_NAME.to_string(),
            HandleResource::<SloCorrectionConfigResource>::factory(),
        ),
        (
            synthetic_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<SyntheticAlertConfigResource>::factory(),
        ),
        (
            website_alert_config::RESOURCE_NAME.to_string(),
            HandleResource::<WebsiteAlertConfigResource>::factory(),
        ),
        (
            website_monitoring_config::RESOURCE_NAME.to_string(),
            HandleResource::<WebsiteMonitoringConfigResource>::factory(),
        ),
    ])
}

/// Platform assigned or client generated id, kept stable across plans
pub(crate) fn id_attribute() -> Attribute {
    AttributeBuilder::string("id")
        .computed()
        .plan_modifier(UseStateForUnknown)
        .description("The ID of the object")
        .build()
}

pub(crate) fn string_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .required()
        .description(description)
        .build()
}

/// Value of a list block with a single element
pub(crate) fn single_block<I, K>(fields: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::List(vec![Value::object(fields)])
}

/// Attributes of one nested block; errors point at the block's path
pub(crate) struct BlockReader<'a> {
    pub block: &'a Value,
    pub path: AttributePath,
}

impl<'a> BlockReader<'a> {
    pub fn new(block: &'a Value, path: AttributePath) -> Self {
        Self { block, path }
    }

    fn unset(&self, name: &str) -> MappingError {
        MappingError::parse(self.path.clone().attribute(name), format!("{} must be set", name))
    }

    pub fn string(&self, name: &str) -> Result<String, MappingError> {
        self.block
            .get_non_empty_string(name)
            .ok_or_else(|| self.unset(name))
    }

    pub fn int(&self, name: &str) -> Result<i64, MappingError> {
        self.block.get_i64(name).ok_or_else(|| self.unset(name))
    }

    pub fn float(&self, name: &str) -> Result<f64, MappingError> {
        self.block.get_f64(name).ok_or_else(|| self.unset(name))
    }

    pub fn optional_string(&self, name: &str) -> Option<String> {
        self.block.get_non_empty_string(name)
    }

    /// Wire form of the tag filter text in `name`
    pub fn tag_filter(&self, name: &str) -> Result<Option<TagFilter>, MappingError> {
        tagfilter::wire_from_text(self.block.get_string(name).as_deref())
            .map_err(|e| MappingError::tag_filter(self.path.clone().attribute(name), e))
    }

    /// The single element of list block `name`
    pub fn child(&self, name: &str) -> Option<BlockReader<'a>> {
        let block = self.block.get_block(name)?;
        Some(BlockReader::new(block, self.path.clone().attribute(name).index(0)))
    }

    pub fn children(&self, name: &str) -> Vec<BlockReader<'a>> {
        self.block
            .get_blocks(name)
            .iter()
            .enumerate()
            .map(|(idx, block)| {
                BlockReader::new(block, self.path.clone().attribute(name).index(idx as i64))
            })
            .collect()
    }
}

/// Plans a tag filter exactly as configured; absent in config is absent in
/// plan. Equivalent spellings are reconciled when the state is written.
pub(crate) struct ConfiguredTagFilter;

impl PlanModifier for ConfiguredTagFilter {
    fn description(&self) -> String {
        "Tag filter expressions are planned as written".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match request.config {
            Value::Unknown => request.plan,
            config => config,
        };
        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Optional tag filter attribute
pub(crate) fn tag_filter_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .optional()
        .computed()
        .plan_modifier(ConfiguredTagFilter)
        .description(description)
        .build()
}

/// Wire form of the tag filter attribute `name`
pub(crate) fn tag_filter_from_state(
    state: &Value,
    name: &str,
) -> Result<Option<TagFilter>, MappingError> {
    tagfilter::wire_from_text(state.get_string(name).as_deref())
        .map_err(|e| MappingError::tag_filter(AttributePath::new(name), e))
}

/// State rendition of a wire tag filter. `prior` is the stored text of the
/// attribute; it is kept while it denotes the same expression, otherwise the
/// normalized form is recorded.
pub(crate) fn tag_filter_to_state(
    prior: &Value,
    wire: Option<&TagFilter>,
) -> Result<Value, MappingError> {
    let normalized = tagfilter::normalized_from_wire(wire)
        .map_err(|e| MappingError::unsupported("tag filter", e.to_string()))?;
    match prior {
        Value::String(text) if tagfilter::normalize(text).is_ok_and(|n| n == normalized) => {
            Ok(Value::from(text.as_str()))
        }
        _ => Ok(Value::from(normalized)),
    }
}

pub(crate) const ACCESS_RULE: &str = "access_rule";

fn access_rule_block() -> Block {
    BlockBuilder::new()
        .description("Grants access to the object")
        .attribute(
            AttributeBuilder::string("access_type")
                .required()
                .validator(OneOf::new(ACCESS_TYPES.iter().copied()))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("relation_type")
                .required()
                .validator(OneOf::new(RELATION_TYPES.iter().copied()))
                .build(),
        )
        .attribute(AttributeBuilder::string("related_id").optional().build())
        .build()
}

pub(crate) fn access_rule_schema_block() -> NestedBlock {
    NestedBlock::list(ACCESS_RULE, access_rule_block())
}

pub(crate) fn access_rules_from_state(state: &Value) -> Result<Vec<AccessRule>, MappingError> {
    state
        .get_blocks(ACCESS_RULE)
        .iter()
        .enumerate()
        .map(|(idx, rule)| {
            let field = |name: &str| {
                rule.get_non_empty_string(name).ok_or_else(|| {
                    MappingError::parse(
                        AttributePath::new(ACCESS_RULE).index(idx as i64).attribute(name),
                        format!("{} must be set", name),
                    )
                })
            };
            Ok(AccessRule {
                access_type: field("access_type")?,
                relation_type: field("relation_type")?,
                related_id: rule.get_non_empty_string("related_id"),
            })
        })
        .collect()
}

pub(crate) fn access_rules_to_state(rules: &[AccessRule]) -> Value {
    if rules.is_empty() {
        return Value::Null;
    }
    Value::List(
        rules
            .iter()
            .map(|rule| {
                Value::object([
                    ("access_type", Value::from(rule.access_type.as_str())),
                    ("relation_type", Value::from(rule.relation_type.as_str())),
                    ("related_id", Value::from(rule.related_id.clone())),
                ])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_is_registered() {
        let names: Vec<String> = {
            let mut names: Vec<String> = factories().into_keys().collect();
            names.sort();
            names
        };
        assert_eq!(names.len(), 21);
        assert!(names.contains(&"instana_global_application_alert_config".to_string()));
        assert!(names.iter().all(|n| n.starts_with("instana_")));
        assert!(names.contains(&"instana_api_token".to_string()));
    }

    fn plan_tag_filter(state: Value, config: Value) -> Value {
        ConfiguredTagFilter
            .modify_plan(PlanModifyRequest {
                state,
                plan: Value::Unknown,
                config,
                path: AttributePath::new("tag_filter"),
            })
            .plan_value
    }

    #[test]
    fn tag_filters_are_planned_as_configured() {
        let spelled = Value::from("request.path@dest eQuAlS \"/home\"");
        assert_eq!(plan_tag_filter(Value::Null, spelled.clone()), spelled);
        assert_eq!(
            plan_tag_filter(Value::from("request.path@dest EQUALS '/home'"), spelled.clone()),
            spelled
        );
        assert!(plan_tag_filter(Value::from("a EQUALS 'b'"), Value::Null).is_null());
        assert_eq!(plan_tag_filter(Value::Null, Value::from("  ")), Value::from("  "));
        assert!(plan_tag_filter(Value::Null, Value::Unknown).is_unknown());
    }

    #[test]
    fn equivalent_tag_filter_text_survives_a_read() {
        let spelled = "request.path@dest eQuAlS \"/home\"";
        let wire = tagfilter::wire_from_text(Some("request.path@dest EQUALS '/home'"))
            .unwrap()
            .unwrap();

        let kept = tag_filter_to_state(&Value::from(spelled), Some(&wire)).unwrap();
        assert_eq!(kept, Value::from(spelled));

        let replaced = tag_filter_to_state(&Value::from("a EQUALS 'b'"), Some(&wire)).unwrap();
        assert_eq!(replaced, Value::from("request.path@dest EQUALS '/home'"));
        assert_eq!(
            tag_filter_to_state(&Value::Null, Some(&wire)).unwrap(),
            Value::from("request.path@dest EQUALS '/home'")
        );
        assert_eq!(
            tag_filter_to_state(&Value::from(" "), None).unwrap(),
            Value::from(" ")
        );
        assert!(tag_filter_to_state(&Value::Null, None).unwrap().is_null());
    }

    #[test]
    fn access_rules_map_both_ways() {
        let rules = vec![
            AccessRule {
                access_type: "READ_WRITE".to_string(),
                relation_type: "GLOBAL".to_string(),
                related_id: None,
            },
            AccessRule {
                access_type: "READ".to_string(),
                relation_type: "USER".to_string(),
                related_id: Some("u1".to_string()),
            },
        ];
        let state = Value::object([(ACCESS_RULE, access_rules_to_state(&rules))]);
        assert_eq!(access_rules_from_state(&state).unwrap(), rules);
        assert!(access_rules_to_state(&[]).is_null());
    }

    #[test]
    fn access_rule_without_type_is_a_parse_error() {
        let state = Value::object([(
            ACCESS_RULE,
            Value::List(vec![Value::object([("relation_type", Value::from("GLOBAL"))])]),
        )]);
        match access_rules_from_state(&state) {
            Err(MappingError::ParseError { path, .. }) => assert_eq!(
                path,
                AttributePath::new(ACCESS_RULE).index(0).attribute("access_type")
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
