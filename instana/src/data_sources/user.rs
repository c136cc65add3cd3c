//! instana_user data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::{AttributeBuilder, Schema, SchemaBuilder, Value};

use super::{key, not_found, Lookup, LookupError};
use crate::api::Client;

pub const DATA_SOURCE_NAME: &str = "instana_user";

#[derive(Default)]
pub struct UserDataSource;

#[async_trait]
impl Lookup for UserDataSource {
    const TYPE_NAME: &'static str = DATA_SOURCE_NAME;

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Looks up a user by email address")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("email").required().build())
            .attribute(AttributeBuilder::string("full_name").computed().build())
            .build()
    }

    async fn lookup(
        &self,
        ctx: &Context,
        client: &Client,
        config: &Value,
    ) -> Result<Value, LookupError> {
        let email = key(config, "email");
        let user = client
            .users()
            .get_all(ctx)
            .await?
            .into_iter()
            .find(|user| user.email == email)
            .ok_or_else(|| not_found("user", &[("email", email.as_str())]))?;

        Ok(Value::object([
            ("id", Value::from(user.id)),
            ("email", Value::from(user.email)),
            ("full_name", Value::from(user.full_name)),
        ]))
    }
}
