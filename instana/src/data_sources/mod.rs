//! Read-only data sources
//!
//! Every data source is a [`Lookup`] wrapped in [`LookupDataSource`], which
//! owns the provider wiring and turns lookup failures into diagnostics.

pub mod alerting_channel;
pub mod automation_action;
pub mod builtin_event_spec;
pub mod custom_event_spec;
pub mod host_agents;
pub mod synthetic_location;
pub mod user;

pub use alerting_channel::AlertingChannelDataSource;
pub use automation_action::AutomationActionDataSource;
pub use builtin_event_spec::BuiltinEventSpecDataSource;
pub use custom_event_spec::CustomEventSpecDataSource;
pub use host_agents::HostAgentsDataSource;
pub use synthetic_location::SyntheticLocationDataSource;
pub use user::UserDataSource;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceFactory,
    ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::{Diagnostics, ProtocolVersion, Schema, Value};

use crate::api::{ApiError, Client};
use crate::provider_data::InstanaProviderData;
use crate::resourcehandle::MappingError;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// `no <thing> found for <key> '<value>' and <key> '<value>'`
pub(crate) fn not_found(thing: &str, keys: &[(&str, &str)]) -> LookupError {
    let keys = keys
        .iter()
        .map(|(key, value)| format!("{} '{}'", key, value))
        .collect::<Vec<_>>()
        .join(" and ");
    LookupError::NotFound(format!("no {} found for {}", thing, keys))
}

/// Configured string of a lookup key; unknown and null read as empty
pub(crate) fn key(config: &Value, name: &str) -> String {
    config.get_string(name).unwrap_or_default()
}

/// One read-only query against the Platform
#[async_trait]
pub trait Lookup: Default + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn schema(&self) -> Schema;

    fn supports(&self, _protocol: ProtocolVersion) -> bool {
        true
    }

    /// Full state for `config`
    async fn lookup(
        &self,
        ctx: &Context,
        client: &Client,
        config: &Value,
    ) -> Result<Value, LookupError>;
}

#[derive(Default)]
pub struct LookupDataSource<L: Lookup> {
    lookup: L,
    client: Option<Client>,
}

impl<L: Lookup> LookupDataSource<L> {
    pub fn with_client(client: Client) -> Self {
        Self {
            lookup: L::default(),
            client: Some(client),
        }
    }

    pub fn factory() -> DataSourceFactory {
        Arc::new(|| Box::new(LookupDataSource::<L>::default()))
    }

    fn failure(&self, err: LookupError) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        match err {
            LookupError::Api(ApiError::Cancelled) => {
                tracing::debug!("read of {} cancelled", L::TYPE_NAME);
            }
            LookupError::Mapping(err) => diagnostics.push(err.into_diagnostic(L::TYPE_NAME)),
            err => {
                diagnostics.add_error(format!("Failed to read {}", L::TYPE_NAME), err.to_string())
            }
        }
        diagnostics
    }
}

#[async_trait]
impl<L: Lookup> DataSource for LookupDataSource<L> {
    fn type_name(&self) -> &str {
        L::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.lookup.schema()
    }

    fn supports(&self, protocol: ProtocolVersion) -> bool {
        self.lookup.supports(protocol)
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = Diagnostics::new();
        if let Some(data) = request.provider_data {
            match data.downcast_ref::<InstanaProviderData>() {
                Some(data) => self.client = Some(data.client.clone()),
                None => diagnostics.add_error(
                    "Unexpected provider data",
                    format!("{} received provider data of an unknown type", L::TYPE_NAME),
                ),
            }
        }
        ConfigureDataSourceResponse { diagnostics }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(client) = &self.client else {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error(
                "Provider not configured",
                format!(
                    "{} requires a configured provider with api_token and endpoint",
                    L::TYPE_NAME
                ),
            );
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics,
            };
        };

        tracing::debug!("reading {}", L::TYPE_NAME);
        match self.lookup.lookup(&ctx, client, &request.config).await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: Diagnostics::new(),
            },
            Err(err) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: self.failure(err),
            },
        }
    }
}

pub fn factories() -> HashMap<String, DataSourceFactory> {
    HashMap::from([
        (
            alerting_channel::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<AlertingChannelDataSource>::factory(),
        ),
        (
            automation_action::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<AutomationActionDataSource>::factory(),
        ),
        (
            builtin_event_spec::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<BuiltinEventSpecDataSource>::factory(),
        ),
        (
            custom_event_spec::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<CustomEventSpecDataSource>::factory(),
        ),
        (
            host_agents::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<HostAgentsDataSource>::factory(),
        ),
        (
            synthetic_location::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<SyntheticLocationDataSource>::factory(),
        ),
        (
            user::DATA_SOURCE_NAME.to_string(),
            LookupDataSource::<UserDataSource>::factory(),
        ),
    ])
}
