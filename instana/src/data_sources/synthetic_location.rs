//! instana_synthetic_location data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, ProtocolVersion, Schema, SchemaBuilder, Value};

use super::{key, not_found, Lookup, LookupError};
use crate::api::Client;

pub const DATA_SOURCE_NAME: &str = "instana_synthetic_location";

/// Synthetic location looked up by label and location type; served on
/// tfplugin6 only
#[derive(Default)]
pub struct SyntheticLocationDataSource;

#[async_trait]
impl Lookup for SyntheticLocationDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Looks up a location synthetic tests run from")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("label")
                    .optional()
                    .description("Friendly name of the location")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("location_type")
                    .optional()
                    .description("Whether the location is public or private")
                    .build(),
            )
            .build()
    }

    fn supports(&self, protocol: ProtocolVersion) -> bool {
        protocol == ProtocolVersion::V6
    }

    async fn lookup(
        &self,
        ctx: &Context,
        client: &Client,
        config: &Value,
    ) -> Result<Value, LookupError> {
        let label = key(config, "label");
        let location_type = key(config, "location_type");
        let location = client
            .synthetic_locations()
            .get_all(ctx)
            .await?
            .into_iter()
            .find(|l| l.label == label && l.location_type == location_type)
            .ok_or_else(|| {
                not_found(
                    "synthetic location",
                    &[
                        ("label", label.as_str()),
                        ("location type", location_type.as_str()),
                    ],
                )
            })?;

        Ok(Value::object([
            ("id", Value::from(location.id)),
            ("label", Value::from(location.label)),
            ("description", Value::from(location.description)),
            ("location_type", Value::from(location.location_type)),
        ]))
    }
}
