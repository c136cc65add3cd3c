//! Provider trait and related types

use crate::context::Context;
use crate::data_source::DataSourceFactory;
use crate::resource::ResourceFactory;
use crate::schema::Schema;
use crate::types::{Diagnostics, Value};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Host protocol a call arrives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// Legacy protocol (tfplugin5)
    V5,
    /// Current protocol (tfplugin6)
    V6,
}

impl ProtocolVersion {
    pub fn number(self) -> u32 {
        match self {
            ProtocolVersion::V5 => 5,
            ProtocolVersion::V6 => 6,
        }
    }

    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            5 => Some(ProtocolVersion::V5),
            6 => Some(ProtocolVersion::V6),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Root of a plugin: provider configuration plus the resource catalogue
#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix shared by every resource and data source type name
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse::default()
    }

    /// Build the data shared with every resource and data source
    async fn configure(
        &self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Factories keyed by full resource type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Factories keyed by full data source type name
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

#[derive(Debug, Clone)]
pub struct ValidateProviderConfigRequest {
    pub config: Value,
}

#[derive(Debug, Default)]
pub struct ValidateProviderConfigResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: Value,
}

#[derive(Default)]
pub struct ConfigureProviderResponse {
    pub diagnostics: Diagnostics,
    /// Handed to every resource and data source through configure
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
