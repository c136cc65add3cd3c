//! Resource trait and related types
//!
//! A resource is created fresh from its factory for every host call, then
//! configured with the provider data before the operation runs. Values in
//! requests have already been decoded against the resource schema.

use crate::context::Context;
use crate::provider::ProtocolVersion;
use crate::schema::Schema;
use crate::types::{AttributePath, Diagnostics, Value};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Base trait for resources - implement CRUD operations
/// Type name should be constant and match the key in Provider.resources()
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name should be constant (e.g., "instana_alerting_channel")
    fn type_name(&self) -> &str;

    /// Schema including the current state version
    fn schema(&self) -> Schema;

    /// Host protocols this resource is exposed under
    fn supports(&self, _protocol: ProtocolVersion) -> bool {
        true
    }

    /// Called immediately after the factory creates the resource
    /// Use this to store API clients, credentials, etc. from provider
    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse::default()
    }

    /// Resource specific validation, run after the schema checks
    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse::default()
    }

    /// Called AFTER the framework's default planning logic
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        ModifyPlanResponse {
            planned_state: request.planned_state,
            requires_replace: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// MUST populate all attributes in response.new_state (including computed)
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// MUST return accurate current state or None if resource doesn't exist
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;

    /// Default import stores the host id into `id`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut state = Value::Null;
        state.set("id", Value::String(request.id));
        ImportResourceStateResponse {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Bring a stored state of an older schema version up to date
    /// The default passes the stored tree through unchanged
    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        UpgradeResourceStateResponse {
            upgraded_state: request.raw_state,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Builds a fresh resource instance per host call
pub type ResourceFactory = Arc<dyn Fn() -> Box<dyn Resource> + Send + Sync>;

#[derive(Default)]
pub struct ConfigureResourceRequest {
    /// Data from ConfigureProviderResponse.provider_data
    /// Downcast to your provider's specific type
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

#[derive(Debug, Default)]
pub struct ConfigureResourceResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: Value,
}

#[derive(Debug, Default)]
pub struct ValidateResourceConfigResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ModifyPlanRequest {
    pub type_name: String,
    pub config: Value,
    pub prior_state: Value,
    pub planned_state: Value,
}

#[derive(Debug)]
pub struct ModifyPlanResponse {
    pub planned_state: Value,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: Value,
    pub config: Value,
}

#[derive(Debug)]
pub struct CreateResourceResponse {
    pub new_state: Value,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: Value,
}

#[derive(Debug)]
pub struct ReadResourceResponse {
    /// None when the remote object no longer exists
    pub new_state: Option<Value>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: Value,
    pub planned_state: Value,
    pub config: Value,
}

#[derive(Debug)]
pub struct UpdateResourceResponse {
    pub new_state: Value,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: Value,
}

#[derive(Debug, Default)]
pub struct DeleteResourceResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
}

#[derive(Debug)]
pub struct ImportResourceStateResponse {
    /// None when nothing could be imported
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct UpgradeResourceStateRequest {
    pub type_name: String,
    /// Schema version recorded with the stored state
    pub version: i64,
    /// Stored state decoded without a schema
    pub raw_state: Value,
}

#[derive(Debug)]
pub struct UpgradeResourceStateResponse {
    pub upgraded_state: Value,
    pub diagnostics: Diagnostics,
}
