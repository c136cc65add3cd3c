//! instana_application_config

use tfplug::defaults::StaticDefault;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, SchemaBuilder, Value};

use super::{
    access_rule_schema_block, access_rules_from_state, access_rules_to_state, id_attribute,
    string_attribute, tag_filter_attribute, tag_filter_from_state, tag_filter_to_state,
    ACCESS_RULE,
};
use crate::api::models::application_config::{APPLICATION_CONFIG_SCOPES, BOUNDARY_SCOPES};
use crate::api::models::ApplicationConfig;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_application_config";

pub const DEFAULT_SCOPE: &str = "INCLUDE_NO_DOWNSTREAM";
pub const DEFAULT_BOUNDARY_SCOPE: &str = "DEFAULT";

#[derive(Default)]
pub struct ApplicationConfigResource;

impl ResourceHandle for ApplicationConfigResource {
    type Object = ApplicationConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("Application perspective grouping calls by a tag filter")
            .attribute(id_attribute())
            .attribute(string_attribute("label", "Label of the application"))
            .attribute(
                AttributeBuilder::string("scope")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(DEFAULT_SCOPE))
                    .validator(OneOf::new(APPLICATION_CONFIG_SCOPES.iter().copied()))
                    .description("Which downstream calls belong to the application")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("boundary_scope")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(DEFAULT_BOUNDARY_SCOPE))
                    .validator(OneOf::new(BOUNDARY_SCOPES.iter().copied()))
                    .description("Which calls enter the application")
                    .build(),
            )
            .attribute(tag_filter_attribute(
                "tag_filter",
                "Tag filter selecting the calls of the application",
            ))
            .block(access_rule_schema_block().min_items(1))
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<ApplicationConfig> {
        client.application_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<ApplicationConfig, MappingError> {
        Ok(ApplicationConfig {
            id: state.get_string("id").unwrap_or_default(),
            label: required_string(state, "label")?,
            scope: state
                .get_non_empty_string("scope")
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            boundary_scope: state
                .get_non_empty_string("boundary_scope")
                .unwrap_or_else(|| DEFAULT_BOUNDARY_SCOPE.to_string()),
            tag_filter_expression: tag_filter_from_state(state, "tag_filter")?,
            access_rules: access_rules_from_state(state)?,
        })
    }

    fn object_to_state(
        &self,
        state: &Value,
        config: &ApplicationConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("label", Value::from(config.label.as_str())),
            ("scope", Value::from(config.scope.as_str())),
            ("boundary_scope", Value::from(config.boundary_scope.as_str())),
            (
                "tag_filter",
                tag_filter_to_state(
                    state.get("tag_filter"),
                    config.tag_filter_expression.as_ref(),
                )?,
            ),
            (ACCESS_RULE, access_rules_to_state(&config.access_rules)),
        ]))
    }
}
