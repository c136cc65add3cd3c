//! instana_automation_action data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, Schema, SchemaBuilder, Value};

use super::{key, not_found, Lookup, LookupError};
use crate::api::Client;

pub const DATA_SOURCE_NAME: &str = "instana_automation_action";

#[derive(Default)]
pub struct AutomationActionDataSource;

#[async_trait]
impl Lookup for AutomationActionDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Looks up an automation action by name and type")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(
                AttributeBuilder::string("type")
                    .required()
                    .description("Action type, SCRIPT or HTTP")
                    .build(),
            )
            .attribute(AttributeBuilder::string("description").computed().build())
            .attribute(AttributeBuilder::string_list("tags").computed().build())
            .build()
    }

    async fn lookup(
        &self,
        ctx: &Context,
        client: &Client,
        config: &Value,
    ) -> Result<Value, LookupError> {
        let name = key(config, "name");
        let action_type = key(config, "type");
        let action = client
            .automation_actions()
            .get_all(ctx)
            .await?
            .into_iter()
            .find(|action| action.name == name && action.action_type == action_type)
            .ok_or_else(|| {
                not_found(
                    "automation action",
                    &[("name", name.as_str()), ("type", action_type.as_str())],
                )
            })?;

        Ok(Value::object([
            ("id", Value::from(action.id.as_str())),
            ("name", Value::from(action.name.as_str())),
            ("type", Value::from(action.action_type.as_str())),
            ("description", Value::from(action.description.unwrap_or_default())),
            ("tags", Value::string_list(action.tags)),
        ]))
    }
}
