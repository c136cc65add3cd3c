//! instana_api_token
//!
//! Tokens are addressed by the client generated `internal_id`; the Platform
//! assigned `id` is only recorded.

use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::{AttributeBuilder, SchemaBuilder, Value};

use super::{id_attribute, string_attribute};
use crate::api::models::api_token::API_TOKEN_PERMISSIONS;
use crate::api::models::ApiToken;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{
    generate_id, pass_through, required_string, MappingError, ResourceHandle, ResourceMetaData,
    StateUpgrader,
};

pub const RESOURCE_NAME: &str = "instana_api_token";

pub const INTERNAL_ID: &str = "internal_id";
pub const ACCESS_GRANTING_TOKEN: &str = "access_granting_token";

#[derive(Default)]
pub struct ApiTokenResource;

fn permission_description(attribute: &str) -> String {
    format!(
        "Whether the token is allowed to {}",
        attribute.trim_start_matches("can_").replace('_', " ")
    )
}

/// Generated value unless the plan already holds one
fn keep_or_generate(plan: &mut Value, name: &str) {
    if plan.get_non_empty_string(name).is_none() {
        plan.set(name, Value::from(generate_id()));
    }
}

impl ResourceHandle for ApiTokenResource {
    type Object = ApiToken;

    fn metadata(&self) -> ResourceMetaData {
        let mut schema = SchemaBuilder::new()
            .version(2)
            .description("API token granting access to the Instana REST API")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string(ACCESS_GRANTING_TOKEN)
                    .computed()
                    .sensitive()
                    .plan_modifier(UseStateForUnknown)
                    .description("Token sent in the Authorization header by API clients")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string(INTERNAL_ID)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .description("Client generated id addressing the token")
                    .build(),
            )
            .attribute(string_attribute("name", "Name of the API token"));
        for (attribute, _) in API_TOKEN_PERMISSIONS {
            schema = schema.attribute(
                AttributeBuilder::bool(attribute)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .description(&permission_description(attribute))
                    .build(),
            );
        }
        ResourceMetaData::new(RESOURCE_NAME, schema.build())
            .with_id_field_override(INTERNAL_ID)
            .skip_id_generation()
    }

    fn rest_resource(&self, client: &Client) -> RestResource<ApiToken> {
        client.api_tokens()
    }

    fn set_computed(&self, plan: &mut Value) -> Result<(), MappingError> {
        keep_or_generate(plan, INTERNAL_ID);
        keep_or_generate(plan, ACCESS_GRANTING_TOKEN);
        Ok(())
    }

    fn state_to_object(&self, state: &Value, _prior: &Value) -> Result<ApiToken, MappingError> {
        let mut token = ApiToken {
            id: state.get_string("id").unwrap_or_default(),
            access_granting_token: state
                .get_string(ACCESS_GRANTING_TOKEN)
                .unwrap_or_default(),
            internal_id: required_string(state, INTERNAL_ID)?,
            name: required_string(state, "name")?,
            ..Default::default()
        };
        for (attribute, wire_name) in API_TOKEN_PERMISSIONS {
            token.set_permission(wire_name, state.get_bool(attribute).unwrap_or(false));
        }
        Ok(token)
    }

    fn object_to_state(&self, _state: &Value, token: &ApiToken) -> Result<Value, MappingError> {
        let mut state = Value::object([
            ("id", Value::from(token.id.as_str())),
            (
                ACCESS_GRANTING_TOKEN,
                Value::from(token.access_granting_token.as_str()),
            ),
            (INTERNAL_ID, Value::from(token.internal_id.as_str())),
            ("name", Value::from(token.name.as_str())),
        ]);
        for (attribute, wire_name) in API_TOKEN_PERMISSIONS {
            state.set(*attribute, Value::from(token.permission(wire_name)));
        }
        Ok(state)
    }

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        vec![
            StateUpgrader::new(0, pass_through),
            StateUpgrader::new(1, |mut state| {
                if let Some(full_name) = state.remove("full_name") {
                    if state.get("name").is_null() {
                        state.set("name", full_name);
                    }
                }
                Ok(state)
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planned() -> Value {
        Value::object([
            ("name", Value::from("ci")),
            (INTERNAL_ID, Value::Unknown),
            (ACCESS_GRANTING_TOKEN, Value::Unknown),
            ("can_configure_users", Value::from(true)),
        ])
    }

    #[test]
    fn set_computed_generates_ids_once() {
        let mut plan = planned();
        ApiTokenResource.set_computed(&mut plan).unwrap();
        let internal_id = plan.get_string(INTERNAL_ID).unwrap();
        assert_eq!(internal_id.len(), 32);
        assert!(plan.get_non_empty_string(ACCESS_GRANTING_TOKEN).is_some());

        let again = {
            let mut p = plan.clone();
            ApiTokenResource.set_computed(&mut p).unwrap();
            p
        };
        assert_eq!(again, plan);
    }

    #[test]
    fn permissions_map_to_wire_flags() {
        let mut plan = planned();
        ApiTokenResource.set_computed(&mut plan).unwrap();
        let token = ApiTokenResource.state_to_object(&plan, &Value::Null).unwrap();
        assert!(token.permission("canConfigureUsers"));
        assert!(!token.permission("canViewLogs"));
        assert_eq!(token.permissions.len(), API_TOKEN_PERMISSIONS.len());

        let state = ApiTokenResource.object_to_state(&plan, &token).unwrap();
        assert_eq!(state.get_bool("can_configure_users"), Some(true));
        assert_eq!(state.get_bool("can_view_logs"), Some(false));
        assert_eq!(ApiTokenResource.state_to_object(&state, &Value::Null).unwrap(), token);
    }

    #[test]
    fn token_is_addressed_by_internal_id() {
        let meta = ApiTokenResource.metadata();
        assert_eq!(meta.id_attribute(), INTERNAL_ID);
        assert!(meta.skip_id_generation);
        assert_eq!(meta.schema_version(), 2);
    }

    #[test]
    fn version_one_full_name_becomes_name() {
        let upgraders = ApiTokenResource.state_upgraders();
        let old = Value::object([
            (INTERNAL_ID, Value::from("i1")),
            ("full_name", Value::from("prefix ci suffix")),
        ]);
        let upgraded = upgraders
            .iter()
            .try_fold(old, |state, u| (u.upgrade)(state))
            .unwrap();
        assert_eq!(upgraded.get_string("name").as_deref(), Some("prefix ci suffix"));
        assert!(upgraded.get("full_name").is_null());
    }
}
