//! instana_alerting_channel data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, Schema, SchemaBuilder, Value};

use super::{key, not_found, Lookup, LookupError};
use crate::api::models::ChannelKind;
use crate::api::Client;

pub const DATA_SOURCE_NAME: &str = "instana_alerting_channel";

/// Alerting channel looked up by name
#[derive(Default)]
pub struct AlertingChannelDataSource;

#[async_trait]
impl Lookup for AlertingChannelDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Looks up an alerting channel by its name")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the alerting channel")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("kind")
                    .computed()
                    .description("Block name of the channel kind, e.g. email or slack")
                    .build(),
            )
            .build()
    }

    async fn lookup(
        &self,
        ctx: &Context,
        client: &Client,
        config: &Value,
    ) -> Result<Value, LookupError> {
        let name = key(config, "name");
        let channel = client
            .alerting_channels()
            .get_all(ctx)
            .await?
            .into_iter()
            .find(|channel| channel.name == name)
            .ok_or_else(|| not_found("alerting channel", &[("name", name.as_str())]))?;

        let kind = ChannelKind::from_wire_name(&channel.kind)
            .map(ChannelKind::block_name)
            .unwrap_or(channel.kind.as_str());
        Ok(Value::object([
            ("id", Value::from(channel.id.as_str())),
            ("name", Value::from(channel.name.as_str())),
            ("kind", Value::from(kind)),
        ]))
    }
}
