//! instana_host_agents data source
//!
//! Unlike the named lookups this one passes the filter to Instana and
//! returns every matching agent.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, AttributeType, Schema, SchemaBuilder, Value};

use super::{key, Lookup, LookupError};
use crate::api::models::HostAgent;
use crate::api::Client;

pub const DATA_SOURCE_NAME: &str = "instana_host_agents";

pub const FILTER: &str = "filter";
pub const ITEMS: &str = "items";

#[derive(Default)]
pub struct HostAgentsDataSource;

fn item_type() -> AttributeType {
    AttributeType::object([
        ("snapshot_id", AttributeType::String),
        ("label", AttributeType::String),
        ("host", AttributeType::String),
        ("plugin", AttributeType::String),
        ("tags", AttributeType::list(AttributeType::String)),
    ])
}

fn agent_to_state(agent: HostAgent) -> Value {
    Value::object([
        ("snapshot_id", Value::from(agent.snapshot_id)),
        ("label", Value::from(agent.label)),
        ("host", Value::from(agent.host)),
        ("plugin", Value::from(agent.plugin)),
        ("tags", Value::string_list(agent.tags)),
    ])
}

#[async_trait]
impl Lookup for HostAgentsDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Host agents matching a dynamic focus query")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string(FILTER)
                    .required()
                    .description("Dynamic focus query selecting the agents")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ITEMS, AttributeType::list(item_type()))
                    .computed()
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
        let filter = key(config, FILTER);
        let agents = client
            .host_agents()
            .get_by_query(ctx, &[("query", filter.as_str())])
            .await?;
        tracing::debug!("{} host agents match '{}'", agents.len(), filter);

        Ok(Value::object([
            ("id", Value::from(format!("host-agents-{}", filter))),
            (FILTER, Value::from(filter)),
            (
                ITEMS,
                Value::List(agents.into_iter().map(agent_to_state).collect()),
            ),
        ]))
    }
}
