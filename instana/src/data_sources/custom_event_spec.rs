//! instana_custom_event_spec data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, Schema, SchemaBuilder, Value};

use super::{key, not_found, Lookup, LookupError};
use crate::api::Client;

pub const DATA_SOURCE_NAME: &str = "instana_custom_event_spec";

#[derive(Default)]
pub struct CustomEventSpecDataSource;

#[async_trait]
impl Lookup for CustomEventSpecDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Looks up a custom event specification by name and entity type")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::string("entity_type").required().build())
            .attribute(AttributeBuilder::string("query").computed().build())
            .attribute(AttributeBuilder::string("description").computed().build())
            .attribute(AttributeBuilder::bool("triggering").computed().build())
            .attribute(AttributeBuilder::bool("enabled").computed().build())
            .build()
    }

    async fn lookup(
        &self,
        ctx: &Context,
        client: &Client,
        config: &Value,
    ) -> Result<Value, LookupError> {
        let name = key(config, "name");
        let entity_type = key(config, "entity_type");
        let spec = client
            .custom_event_specifications()
            .get_all(ctx)
            .await?
            .into_iter()
            .find(|spec| spec.name == name && spec.entity_type == entity_type)
            .ok_or_else(|| {
                not_found(
                    "custom event specification",
                    &[("name", name.as_str()), ("entity type", entity_type.as_str())],
                )
            })?;

        Ok(Value::object([
            ("id", Value::from(spec.id.as_str())),
            ("name", Value::from(spec.name.as_str())),
            ("entity_type", Value::from(spec.entity_type.as_str())),
            ("query", Value::from(spec.query)),
            ("description", Value::from(spec.description)),
            ("triggering", Value::from(spec.triggering)),
            ("enabled", Value::from(spec.enabled)),
        ]))
    }
}
