//! instana_builtin_event_spec data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, Schema, SchemaBuilder, Value};

use super::{key, not_found, Lookup, LookupError};
use crate::api::models::event_specification::severity_name;
use crate::api::Client;
use crate::resourcehandle::MappingError;

pub const DATA_SOURCE_NAME: &str = "instana_builtin_event_spec";

/// Built-in event looked up by name and plugin
#[derive(Default)]
pub struct BuiltinEventSpecDataSource;

#[async_trait]
impl Lookup for BuiltinEventSpecDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Looks up a built-in event specification")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(
                AttributeBuilder::string("short_plugin_id")
                    .required()
                    .description("Plugin the event belongs to, e.g. host")
                    .build(),
            )
            .attribute(AttributeBuilder::string("description").computed().build())
            .attribute(
                AttributeBuilder::string("severity")
                    .computed()
                    .description("warning or critical")
                    .build(),
            )
            .attribute(
                AttributeBuilder::int("severity_code")
                    .computed()
                    .description("Severity as sent by Instana, 5 or 10")
                    .build(),
            )
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
        let plugin = key(config, "short_plugin_id");
        let spec = client
            .builtin_event_specifications()
            .get_all(ctx)
            .await?
            .into_iter()
            .find(|spec| spec.name == name && spec.short_plugin_id == plugin)
            .ok_or_else(|| {
                not_found(
                    "builtin event specification",
                    &[("name", name.as_str()), ("short plugin id", plugin.as_str())],
                )
            })?;

        let severity = severity_name(spec.severity)
            .ok_or_else(|| MappingError::unsupported("event severity", spec.severity.to_string()))?;
        Ok(Value::object([
            ("id", Value::from(spec.id.as_str())),
            ("name", Value::from(spec.name.as_str())),
            ("short_plugin_id", Value::from(spec.short_plugin_id.as_str())),
            ("description", Value::from(spec.description.unwrap_or_default())),
            ("severity", Value::from(severity)),
            ("severity_code", Value::from(i64::from(spec.severity))),
            ("triggering", Value::from(spec.triggering)),
            ("enabled", Value::from(spec.enabled)),
        ]))
    }
}
