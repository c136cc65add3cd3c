//! Protocol independent provider core
//!
//! `ProviderServer` holds the provider, its cached schemas and the shared
//! provider data, and implements every host operation on decoded `Value`s.
//! The `v5` and `v6` adapters translate protobuf messages into calls on this
//! core, so both host protocols share one set of semantics.

use crate::codec;
use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSource, DataSourceFactory, ReadDataSourceRequest,
    ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::plan::{self, PlannedChange};
use crate::provider::{
    ConfigureProviderRequest, ProtocolVersion, Provider, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, Resource,
    ResourceFactory, UpdateResourceRequest, UpgradeResourceStateRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::Schema;
use crate::types::{AttributePath, Diagnostic, Diagnostics, RawState, Value};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Generates the protobuf conversion helpers for one protocol module.
/// Both protocol generations share message shapes for everything the
/// framework uses, so the same code serves either.
macro_rules! proto_conversions {
    ($proto:ident) => {
        use crate::attribute_type::AttributeType;
        use crate::error::{Result as TfplugResult, TfplugError};
        use crate::proto::$proto as pb;
        use crate::schema::{Block, NestingMode, Schema};
        use crate::types::{
            AttributePath, AttributePathStep, Diagnostic, DiagnosticSeverity, Diagnostics,
            RawState, Value,
        };

        pub(crate) fn decode_dynamic(
            dynamic: Option<&pb::DynamicValue>,
            ty: &AttributeType,
        ) -> TfplugResult<Value> {
            match dynamic {
                None => Ok(Value::Null),
                Some(dv) if !dv.msgpack.is_empty() => crate::codec::decode_msgpack(&dv.msgpack, ty),
                Some(dv) if !dv.json.is_empty() => crate::codec::decode_json(&dv.json, ty),
                Some(_) => Ok(Value::Null),
            }
        }

        pub(crate) fn encode_dynamic(
            value: &Value,
            ty: &AttributeType,
        ) -> TfplugResult<pb::DynamicValue> {
            Ok(pb::DynamicValue {
                msgpack: crate::codec::encode_msgpack(value, ty)?,
                json: Vec::new(),
            })
        }

        /// Decode a payload against the schema registered for `type_name`
        pub(crate) fn decode_for(
            schema: Option<&Schema>,
            kind: &str,
            type_name: &str,
            dynamic: Option<&pb::DynamicValue>,
        ) -> ::std::result::Result<Value, Vec<pb::Diagnostic>> {
            let schema =
                schema.ok_or_else(|| diagnostics_to_proto(super::unknown_type(kind, type_name)))?;
            decode_dynamic(dynamic, &schema.value_type())
                .map_err(|e| error_diagnostics("Unable to decode request payload", &e))
        }

        pub(crate) fn encode_for(
            schema: Option<&Schema>,
            value: &Value,
        ) -> ::std::result::Result<Option<pb::DynamicValue>, Vec<pb::Diagnostic>> {
            let Some(schema) = schema else {
                return Ok(None);
            };
            encode_dynamic(value, &schema.value_type())
                .map(Some)
                .map_err(|e| error_diagnostics("Unable to encode response payload", &e))
        }

        pub(crate) fn diagnostics_to_proto(diagnostics: Diagnostics) -> Vec<pb::Diagnostic> {
            diagnostics
                .into_iter()
                .map(|d| pb::Diagnostic {
                    severity: match d.severity {
                        DiagnosticSeverity::Error => pb::diagnostic::Severity::Error as i32,
                        DiagnosticSeverity::Warning => pb::diagnostic::Severity::Warning as i32,
                    },
                    summary: d.summary,
                    detail: d.detail,
                    attribute: d.attribute.as_ref().map(path_to_proto),
                })
                .collect()
        }

        pub(crate) fn error_diagnostics(summary: &str, err: &TfplugError) -> Vec<pb::Diagnostic> {
            diagnostics_to_proto(Diagnostics::from(Diagnostic::error(summary, err.to_string())))
        }

        pub(crate) fn path_to_proto(path: &AttributePath) -> pb::AttributePath {
            use pb::attribute_path::step::Selector;

            pb::AttributePath {
                steps: path
                    .steps
                    .iter()
                    .map(|step| pb::attribute_path::Step {
                        selector: Some(match step {
                            AttributePathStep::AttributeName(name) => {
                                Selector::AttributeName(name.clone())
                            }
                            AttributePathStep::ElementKeyString(key) => {
                                Selector::ElementKeyString(key.clone())
                            }
                            AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                        }),
                    })
                    .collect(),
            }
        }

        pub(crate) fn raw_state_from_proto(raw: Option<pb::RawState>) -> RawState {
            match raw {
                Some(raw) => RawState {
                    json: (!raw.json.is_empty()).then_some(raw.json),
                    flatmap: raw.flatmap,
                },
                None => RawState::default(),
            }
        }

        pub(crate) fn schema_to_proto(schema: &Schema) -> pb::Schema {
            pb::Schema {
                version: schema.version,
                block: Some(block_to_proto(&schema.block, schema.version)),
            }
        }

        fn block_to_proto(block: &Block, version: i64) -> pb::schema::Block {
            pb::schema::Block {
                version,
                attributes: block
                    .attributes
                    .iter()
                    .map(|attr| pb::schema::Attribute {
                        name: attr.name.clone(),
                        r#type: attr.r#type.to_bytes(),
                        description: attr.description.clone(),
                        required: attr.required,
                        optional: attr.optional || (attr.default.is_some() && !attr.required),
                        computed: attr.computed || attr.default.is_some(),
                        sensitive: attr.sensitive,
                        description_kind: pb::StringKind::Plain as i32,
                        deprecated: attr.deprecated,
                        ..Default::default()
                    })
                    .collect(),
                block_types: block
                    .blocks
                    .iter()
                    .map(|nested| pb::schema::NestedBlock {
                        type_name: nested.type_name.clone(),
                        block: Some(block_to_proto(&nested.block, version)),
                        nesting: match nested.nesting {
                            NestingMode::Single => {
                                pb::schema::nested_block::NestingMode::Single as i32
                            }
                            NestingMode::List => pb::schema::nested_block::NestingMode::List as i32,
                            NestingMode::Set => pb::schema::nested_block::NestingMode::Set as i32,
                        },
                        min_items: nested.min_items,
                        max_items: nested.max_items,
                    })
                    .collect(),
                description: block.description.clone(),
                description_kind: pb::StringKind::Plain as i32,
                deprecated: block.deprecated,
            }
        }
    };
}

pub mod v5;
pub mod v6;

/// Result of an operation that yields a value plus diagnostics
#[derive(Debug, Default)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Outcome<T> {
    fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }
}

/// Discovery view of the provider for one protocol
pub struct Catalogue<'a> {
    pub provider: &'a Schema,
    pub resources: BTreeMap<&'a str, &'a Schema>,
    pub data_sources: BTreeMap<&'a str, &'a Schema>,
}

struct Registered<F> {
    factory: F,
    schema: Schema,
    v5: bool,
    v6: bool,
}

impl<F> Registered<F> {
    fn supports(&self, protocol: ProtocolVersion) -> bool {
        match protocol {
            ProtocolVersion::V5 => self.v5,
            ProtocolVersion::V6 => self.v6,
        }
    }
}

pub struct ProviderServer<P: Provider> {
    provider: P,
    provider_schema: Schema,
    resources: HashMap<String, Registered<ResourceFactory>>,
    data_sources: HashMap<String, Registered<DataSourceFactory>>,
    provider_data: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    stop: Context,
}

impl<P: Provider + 'static> ProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let provider_schema = provider.schema();

        let resources = provider
            .resources()
            .into_iter()
            .map(|(name, factory)| {
                let instance = factory();
                let registered = Registered {
                    schema: instance.schema(),
                    v5: instance.supports(ProtocolVersion::V5),
                    v6: instance.supports(ProtocolVersion::V6),
                    factory,
                };
                (name, registered)
            })
            .collect();

        let data_sources = provider
            .data_sources()
            .into_iter()
            .map(|(name, factory)| {
                let instance = factory();
                let registered = Registered {
                    schema: instance.schema(),
                    v5: instance.supports(ProtocolVersion::V5),
                    v6: instance.supports(ProtocolVersion::V6),
                    factory,
                };
                (name, registered)
            })
            .collect();

        Self {
            provider,
            provider_schema,
            resources,
            data_sources,
            provider_data: RwLock::new(None),
            stop: Context::new(),
        }
    }

    /// Schemas visible to a protocol
    pub fn catalogue(&self, protocol: ProtocolVersion) -> Catalogue<'_> {
        Catalogue {
            provider: &self.provider_schema,
            resources: self
                .resources
                .iter()
                .filter(|(_, r)| r.supports(protocol))
                .map(|(name, r)| (name.as_str(), &r.schema))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .filter(|(_, d)| d.supports(protocol))
                .map(|(name, d)| (name.as_str(), &d.schema))
                .collect(),
        }
    }

    pub fn provider_schema(&self) -> &Schema {
        &self.provider_schema
    }

    pub fn resource_schema(&self, type_name: &str) -> Option<&Schema> {
        self.resources.get(type_name).map(|r| &r.schema)
    }

    pub fn data_source_schema(&self, type_name: &str) -> Option<&Schema> {
        self.data_sources.get(type_name).map(|d| &d.schema)
    }

    /// Cancel every in-flight and future operation
    pub fn stop(&self) {
        tracing::info!("Stop requested, cancelling in-flight operations");
        self.stop.cancel();
    }

    fn operation_context(&self) -> Context {
        self.stop.child_context()
    }

    async fn instantiate_resource(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
    ) -> Result<Box<dyn Resource>, Diagnostics> {
        let registered = self.resources.get(type_name).ok_or_else(|| {
            Diagnostics::from(Diagnostic::error(
                "Unknown resource type",
                TfplugError::ResourceNotFound(type_name.to_string()).to_string(),
            ))
        })?;
        if !registered.supports(protocol) {
            return Err(not_implemented("resource", type_name, protocol));
        }

        let mut resource = (registered.factory)();
        let provider_data = self.provider_data.read().await.clone();
        let resp = resource
            .configure(
                self.operation_context(),
                ConfigureResourceRequest { provider_data },
            )
            .await;
        if resp.diagnostics.has_errors() {
            return Err(resp.diagnostics);
        }
        Ok(resource)
    }

    async fn instantiate_data_source(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
    ) -> Result<Box<dyn DataSource>, Diagnostics> {
        let registered = self.data_sources.get(type_name).ok_or_else(|| {
            Diagnostics::from(Diagnostic::error(
                "Unknown data source type",
                TfplugError::DataSourceNotFound(type_name.to_string()).to_string(),
            ))
        })?;
        if !registered.supports(protocol) {
            return Err(not_implemented("data source", type_name, protocol));
        }

        let mut data_source = (registered.factory)();
        let provider_data = self.provider_data.read().await.clone();
        let resp = data_source
            .configure(
                self.operation_context(),
                ConfigureDataSourceRequest { provider_data },
            )
            .await;
        if resp.diagnostics.has_errors() {
            return Err(resp.diagnostics);
        }
        Ok(data_source)
    }

    pub async fn validate_provider_config(&self, config: Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        plan::validate_config(
            &self.provider_schema.block,
            &config,
            &AttributePath::root(),
            &mut diagnostics,
        );
        let resp = self
            .provider
            .validate(
                self.operation_context(),
                ValidateProviderConfigRequest { config },
            )
            .await;
        diagnostics.extend(resp.diagnostics);
        diagnostics
    }

    pub async fn configure_provider(
        &self,
        terraform_version: String,
        config: Value,
    ) -> Diagnostics {
        tracing::info!(terraform_version = %terraform_version, "Configuring provider");
        let resp = self
            .provider
            .configure(
                self.operation_context(),
                ConfigureProviderRequest {
                    terraform_version,
                    config,
                },
            )
            .await;
        if !resp.diagnostics.has_errors() {
            *self.provider_data.write().await = resp.provider_data;
        }
        resp.diagnostics
    }

    pub async fn validate_resource_config(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        config: Value,
    ) -> Diagnostics {
        let Some(registered) = self.resources.get(type_name) else {
            return unknown_type("resource", type_name);
        };
        if !registered.supports(protocol) {
            return not_implemented("resource", type_name, protocol);
        }

        let mut diagnostics = Diagnostics::new();
        plan::validate_config(
            &registered.schema.block,
            &config,
            &AttributePath::root(),
            &mut diagnostics,
        );

        // validation must not require a configured provider
        let resource = (registered.factory)();
        let resp = resource
            .validate(
                self.operation_context(),
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(resp.diagnostics);
        diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        config: Value,
    ) -> Diagnostics {
        let Some(registered) = self.data_sources.get(type_name) else {
            return unknown_type("data source", type_name);
        };
        if !registered.supports(protocol) {
            return not_implemented("data source", type_name, protocol);
        }

        let mut diagnostics = Diagnostics::new();
        plan::validate_config(
            &registered.schema.block,
            &config,
            &AttributePath::root(),
            &mut diagnostics,
        );

        let data_source = (registered.factory)();
        let resp = data_source
            .validate(
                self.operation_context(),
                ValidateDataSourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(resp.diagnostics);
        diagnostics
    }

    pub async fn upgrade_resource_state(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        version: i64,
        raw_state: RawState,
    ) -> Outcome<Value> {
        let resource = match self.instantiate_resource(protocol, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return Outcome::new(Value::Null, diagnostics),
        };
        let Some(schema) = self.resource_schema(type_name) else {
            return Outcome::new(Value::Null, unknown_type("resource", type_name));
        };
        let ty = schema.value_type();

        let Some(json) = raw_state.json else {
            if raw_state.flatmap.is_empty() {
                return Outcome::new(Value::Null, Diagnostics::new());
            }
            return Outcome::new(
                Value::Null,
                Diagnostic::error(
                    "Unable to upgrade resource state",
                    "Flatmap state is not supported; refresh the resource with a newer Terraform version",
                )
                .into(),
            );
        };

        if version == schema.version {
            return match codec::decode_json(&json, &ty) {
                Ok(value) => Outcome::new(value, Diagnostics::new()),
                Err(e) => {
                    Outcome::new(Value::Null, decode_error("Unable to read stored state", &e))
                }
            };
        }
        if version > schema.version {
            return Outcome::new(
                Value::Null,
                Diagnostic::error(
                    "Unable to upgrade resource state",
                    format!(
                        "Stored state version {} of {} is newer than the provider's schema version {}",
                        version, type_name, schema.version
                    ),
                )
                .into(),
            );
        }

        let raw = match codec::decode_json_untyped(&json) {
            Ok(raw) => raw,
            Err(e) => {
                return Outcome::new(Value::Null, decode_error("Unable to read stored state", &e))
            }
        };

        tracing::debug!(type_name, from = version, to = schema.version, "Upgrading resource state");
        let resp = resource
            .upgrade_state(
                self.operation_context(),
                UpgradeResourceStateRequest {
                    type_name: type_name.to_string(),
                    version,
                    raw_state: raw,
                },
            )
            .await;
        if resp.diagnostics.has_errors() {
            return Outcome::new(Value::Null, resp.diagnostics);
        }

        match codec::conform(&resp.upgraded_state, &ty) {
            Ok(value) => Outcome::new(value, resp.diagnostics),
            Err(e) => {
                let mut diagnostics = resp.diagnostics;
                diagnostics.extend(decode_error("Upgraded state does not match schema", &e));
                Outcome::new(Value::Null, diagnostics)
            }
        }
    }

    /// Refresh a resource; a vanished remote object yields null state
    pub async fn read_resource(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        current_state: Value,
    ) -> Outcome<Value> {
        if current_state.is_null() {
            return Outcome::new(Value::Null, Diagnostics::new());
        }
        let resource = match self.instantiate_resource(protocol, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return Outcome::new(current_state, diagnostics),
        };

        let ctx = self.operation_context();
        let resp = resource
            .read(
                ctx.clone(),
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state: current_state.clone(),
                },
            )
            .await;

        if ctx.is_cancelled() {
            return Outcome::new(current_state, Diagnostics::new());
        }
        if resp.diagnostics.has_errors() {
            return Outcome::new(current_state, resp.diagnostics);
        }
        match resp.new_state {
            Some(state) => Outcome::new(state, resp.diagnostics),
            None => {
                tracing::info!(type_name, "Remote object no longer exists, removing from state");
                Outcome::new(Value::Null, resp.diagnostics)
            }
        }
    }

    pub async fn plan_resource_change(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        prior_state: Value,
        proposed_new_state: Value,
        config: Value,
    ) -> PlannedChange {
        let Some(registered) = self.resources.get(type_name) else {
            return PlannedChange {
                planned_state: proposed_new_state,
                requires_replace: Vec::new(),
                diagnostics: unknown_type("resource", type_name),
            };
        };
        if !registered.supports(protocol) {
            return PlannedChange {
                planned_state: proposed_new_state,
                requires_replace: Vec::new(),
                diagnostics: not_implemented("resource", type_name, protocol),
            };
        }

        let mut change = plan::plan_resource_change(
            &registered.schema.block,
            &prior_state,
            &proposed_new_state,
            &config,
        );
        if change.planned_state.is_null() || change.diagnostics.has_errors() {
            return change;
        }

        let resource = match self.instantiate_resource(protocol, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                change.diagnostics.extend(diagnostics);
                return change;
            }
        };
        let resp = resource
            .modify_plan(
                self.operation_context(),
                ModifyPlanRequest {
                    type_name: type_name.to_string(),
                    config,
                    prior_state,
                    planned_state: change.planned_state.clone(),
                },
            )
            .await;

        change.planned_state = resp.planned_state;
        for path in resp.requires_replace {
            if !change.requires_replace.contains(&path) {
                change.requires_replace.push(path);
            }
        }
        change.diagnostics.extend(resp.diagnostics);
        change
    }

    /// Create, update or delete depending on which of prior and planned
    /// state are null. Failures and cancellation leave the prior state.
    pub async fn apply_resource_change(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        prior_state: Value,
        planned_state: Value,
        config: Value,
    ) -> Outcome<Value> {
        let resource = match self.instantiate_resource(protocol, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return Outcome::new(prior_state, diagnostics),
        };
        let ctx = self.operation_context();
        let type_name_owned = type_name.to_string();

        let (new_state, diagnostics) = if planned_state.is_null() {
            tracing::info!(type_name, "Deleting resource");
            let resp = resource
                .delete(
                    ctx.clone(),
                    DeleteResourceRequest {
                        type_name: type_name_owned,
                        prior_state: prior_state.clone(),
                    },
                )
                .await;
            (Value::Null, resp.diagnostics)
        } else if prior_state.is_null() {
            tracing::info!(type_name, "Creating resource");
            let resp = resource
                .create(
                    ctx.clone(),
                    CreateResourceRequest {
                        type_name: type_name_owned,
                        planned_state,
                        config,
                    },
                )
                .await;
            (resp.new_state, resp.diagnostics)
        } else {
            tracing::info!(type_name, "Updating resource");
            let resp = resource
                .update(
                    ctx.clone(),
                    UpdateResourceRequest {
                        type_name: type_name_owned,
                        prior_state: prior_state.clone(),
                        planned_state,
                        config,
                    },
                )
                .await;
            (resp.new_state, resp.diagnostics)
        };

        if ctx.is_cancelled() {
            return Outcome::new(prior_state, Diagnostics::new());
        }
        if diagnostics.has_errors() {
            return Outcome::new(prior_state, diagnostics);
        }
        Outcome::new(resolve_unknowns(new_state), diagnostics)
    }

    pub async fn import_resource_state(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        id: String,
    ) -> Outcome<Option<Value>> {
        let resource = match self.instantiate_resource(protocol, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return Outcome::new(None, diagnostics),
        };
        let Some(schema) = self.resource_schema(type_name) else {
            return Outcome::new(None, unknown_type("resource", type_name));
        };

        let ctx = self.operation_context();
        let resp = resource
            .import_state(
                ctx.clone(),
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id,
                },
            )
            .await;
        if ctx.is_cancelled() {
            return Outcome::new(None, Diagnostics::new());
        }
        if resp.diagnostics.has_errors() {
            return Outcome::new(None, resp.diagnostics);
        }

        let state = match resp.state.map(|s| codec::conform(&s, &schema.value_type())) {
            Some(Ok(state)) => Some(state),
            Some(Err(e)) => {
                let mut diagnostics = resp.diagnostics;
                diagnostics.extend(decode_error("Imported state does not match schema", &e));
                return Outcome::new(None, diagnostics);
            }
            None => None,
        };
        Outcome::new(state, resp.diagnostics)
    }

    pub async fn read_data_source(
        &self,
        protocol: ProtocolVersion,
        type_name: &str,
        config: Value,
    ) -> Outcome<Value> {
        let data_source = match self.instantiate_data_source(protocol, type_name).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => return Outcome::new(Value::Null, diagnostics),
        };

        let ctx = self.operation_context();
        let resp = data_source
            .read(
                ctx.clone(),
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config: config.clone(),
                },
            )
            .await;
        if ctx.is_cancelled() {
            return Outcome::new(config, Diagnostics::new());
        }
        if resp.diagnostics.has_errors() {
            return Outcome::new(config, resp.diagnostics);
        }
        Outcome::new(resolve_unknowns(resp.state), resp.diagnostics)
    }
}

pub(crate) fn unknown_type(kind: &str, type_name: &str) -> Diagnostics {
    Diagnostic::error(
        format!("Unknown {} type", kind),
        format!("The provider does not implement the {} type \"{}\".", kind, type_name),
    )
    .into()
}

fn not_implemented(kind: &str, type_name: &str, protocol: ProtocolVersion) -> Diagnostics {
    Diagnostic::error(
        "NotImplemented",
        format!(
            "The {} \"{}\" is not available over plugin protocol version {}.",
            kind, type_name, protocol
        ),
    )
    .into()
}

fn decode_error(summary: &str, err: &TfplugError) -> Diagnostics {
    Diagnostic::error(summary, err.to_string()).into()
}

/// Unknowns cannot be stored; anything the provider left unknown becomes null
fn resolve_unknowns(value: Value) -> Value {
    match value {
        Value::Unknown => Value::Null,
        Value::List(items) => Value::List(items.into_iter().map(resolve_unknowns).collect()),
        Value::Set(items) => Value::Set(items.into_iter().map(resolve_unknowns).collect()),
        Value::Map(fields) => Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k, resolve_unknowns(v)))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, resolve_unknowns(v)))
                .collect(),
        ),
        other => other,
    }
}
