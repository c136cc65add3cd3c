//! Drives the protocol independent core and both adapters with an in-memory provider

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tfplug::codec;
use tfplug::context::Context;
use tfplug::data_source::{
    DataSource, DataSourceFactory, ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::grpc::v5::ProviderServiceV5;
use tfplug::grpc::v6::ProviderServiceV6;
use tfplug::grpc::ProviderServer;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::proto::{tfplugin5, tfplugin6};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProtocolVersion, Provider,
};
use tfplug::resource::*;
use tfplug::types::{AttributePath, Diagnostics, RawState, Value};
use tfplug::{AttributeBuilder, Schema, SchemaBuilder};
use tonic::Request;

type Store = Arc<Mutex<HashMap<String, Value>>>;

struct TestProvider {
    store: Store,
}

impl TestProvider {
    fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Provider for TestProvider {
    fn type_name(&self) -> &str {
        "test"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("token").optional().sensitive().build())
            .build()
    }

    async fn configure(
        &self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = Diagnostics::new();
        if request.config.get_string("token").as_deref() == Some("bad") {
            diagnostics.add_error("Invalid token", "token rejected");
        }
        ConfigureProviderResponse {
            diagnostics,
            provider_data: Some(Arc::new(self.store.clone())),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "test_widget".to_string(),
            Arc::new(|| Box::new(Widget::default()) as Box<dyn Resource>),
        );
        resources.insert(
            "test_modern".to_string(),
            Arc::new(|| Box::new(Modern) as Box<dyn Resource>),
        );
        resources.insert(
            "test_slow".to_string(),
            Arc::new(|| Box::new(Slow) as Box<dyn Resource>),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "test_lookup".to_string(),
            Arc::new(|| Box::new(Lookup::default()) as Box<dyn DataSource>),
        );
        data_sources
    }
}

fn widget_schema() -> Schema {
    SchemaBuilder::new()
        .version(1)
        .attribute(
            AttributeBuilder::string("id")
                .computed()
                .plan_modifier(UseStateForUnknown)
                .build(),
        )
        .attribute(AttributeBuilder::string("name").required().build())
        .attribute(
            AttributeBuilder::string("zone")
                .optional()
                .plan_modifier(RequiresReplace)
                .build(),
        )
        .attribute(
            AttributeBuilder::int("size")
                .optional()
                .default(StaticDefault::int(1))
                .build(),
        )
        .build()
}

#[derive(Default)]
struct Widget {
    store: Option<Store>,
}

impl Widget {
    fn store(&self) -> &Store {
        self.store.as_ref().expect("configured")
    }
}

#[async_trait]
impl Resource for Widget {
    fn type_name(&self) -> &str {
        "test_widget"
    }

    fn schema(&self) -> Schema {
        widget_schema()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        self.store = request
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureResourceResponse::default()
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let id = format!("w-{}", state.get_string("name").unwrap_or_default());
        state.set("id", Value::from(id.as_str()));
        self.store().lock().unwrap().insert(id, state.clone());
        CreateResourceResponse {
            new_state: state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let id = request.current_state.get_string("id").unwrap_or_default();
        ReadResourceResponse {
            new_state: self.store().lock().unwrap().get(&id).cloned(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let id = request.prior_state.get_string("id").unwrap_or_default();
        self.store()
            .lock()
            .unwrap()
            .insert(id, request.planned_state.clone());
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let id = request.prior_state.get_string("id").unwrap_or_default();
        self.store().lock().unwrap().remove(&id);
        DeleteResourceResponse::default()
    }

    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        let mut state = request.raw_state;
        state.remove("full_name");
        UpgradeResourceStateResponse {
            upgraded_state: state,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Only exposed over protocol 6
struct Modern;

#[async_trait]
impl Resource for Modern {
    fn type_name(&self) -> &str {
        "test_modern"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .build()
    }

    fn supports(&self, protocol: ProtocolVersion) -> bool {
        protocol == ProtocolVersion::V6
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        CreateResourceResponse {
            new_state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        DeleteResourceResponse::default()
    }
}

/// Blocks until cancelled
struct Slow;

#[async_trait]
impl Resource for Slow {
    fn type_name(&self) -> &str {
        "test_slow"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .build()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = Diagnostics::new();
        tokio::select! {
            _ = ctx.cancelled() => diagnostics.add_error("interrupted", "context cancelled"),
            _ = tokio::time::sleep(Duration::from_secs(30)) => {}
        }
        CreateResourceResponse {
            new_state: request.planned_state,
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        DeleteResourceResponse::default()
    }
}

#[derive(Default)]
struct Lookup;

#[async_trait]
impl DataSource for Lookup {
    fn type_name(&self) -> &str {
        "test_lookup"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::string("id").computed().build())
            .build()
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut state = request.config;
        let mut diagnostics = Diagnostics::new();
        match state.get_string("name").as_deref() {
            Some("missing") => {
                diagnostics.add_error("Not found", "no lookup found for name 'missing'")
            }
            Some(name) => {
                let id = format!("l-{}", name);
                state.set("id", Value::from(id.as_str()));
            }
            None => {}
        }
        ReadDataSourceResponse { state, diagnostics }
    }
}

async fn configured_server() -> Arc<ProviderServer<TestProvider>> {
    let server = Arc::new(ProviderServer::new(TestProvider::new()));
    let diags = server
        .configure_provider("1.9.0".to_string(), Value::object([("token", Value::from("t"))]))
        .await;
    assert!(diags.is_empty());
    server
}

fn widget(name: &str, zone: Value, size: Value, id: Value) -> Value {
    Value::object([
        ("id", id),
        ("name", Value::from(name)),
        ("zone", zone),
        ("size", size),
    ])
}

#[tokio::test]
async fn schema_discovery_respects_protocol_support() {
    let server = ProviderServer::new(TestProvider::new());

    let v6 = server.catalogue(ProtocolVersion::V6);
    assert!(v6.resources.contains_key("test_modern"));
    assert!(v6.data_sources.contains_key("test_lookup"));

    let v5 = server.catalogue(ProtocolVersion::V5);
    assert!(!v5.resources.contains_key("test_modern"));
    assert!(v5.resources.contains_key("test_widget"));
}

#[tokio::test]
async fn unsupported_protocol_is_not_implemented() {
    let server = configured_server().await;
    let diags = server
        .validate_resource_config(
            ProtocolVersion::V5,
            "test_modern",
            Value::object([("id", Value::Null)]),
        )
        .await;
    assert!(diags.has_errors());
    assert_eq!(diags.iter().next().unwrap().summary, "NotImplemented");
}

#[tokio::test]
async fn validate_reports_missing_required_attribute() {
    let server = configured_server().await;
    let mut config = widget("", Value::Null, Value::Null, Value::Null);
    config.set("name", Value::Null);

    let diags = server
        .validate_resource_config(ProtocolVersion::V6, "test_widget", config)
        .await;
    assert!(diags.has_errors());
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.attribute, Some(AttributePath::new("name")));
}

#[tokio::test]
async fn provider_configure_errors_are_returned() {
    let server = ProviderServer::new(TestProvider::new());
    let diags = server
        .configure_provider("1.9.0".to_string(), Value::object([("token", Value::from("bad"))]))
        .await;
    assert!(diags.has_errors());
}

#[tokio::test]
async fn full_lifecycle_through_core() {
    let server = configured_server().await;
    let config = widget("alpha", Value::from("eu"), Value::Null, Value::Null);

    let change = server
        .plan_resource_change(
            ProtocolVersion::V6,
            "test_widget",
            Value::Null,
            config.clone(),
            config.clone(),
        )
        .await;
    assert!(!change.diagnostics.has_errors());
    assert!(change.planned_state.get("id").is_unknown());
    assert_eq!(change.planned_state.get("size"), &Value::Int(1));

    let created = server
        .apply_resource_change(
            ProtocolVersion::V6,
            "test_widget",
            Value::Null,
            change.planned_state,
            config.clone(),
        )
        .await;
    assert!(created.diagnostics.is_empty());
    assert_eq!(created.value.get_string("id").as_deref(), Some("w-alpha"));

    let read = server
        .read_resource(ProtocolVersion::V6, "test_widget", created.value.clone())
        .await;
    assert_eq!(read.value, created.value);

    // zone forces replacement, id carried from state
    let new_config = widget("alpha", Value::from("us"), Value::Null, Value::Null);
    let mut proposed = new_config.clone();
    proposed.set("id", created.value.get("id").clone());
    proposed.set("size", Value::Int(1));
    let change = server
        .plan_resource_change(
            ProtocolVersion::V6,
            "test_widget",
            created.value.clone(),
            proposed,
            new_config,
        )
        .await;
    assert_eq!(change.requires_replace, vec![AttributePath::new("zone")]);
    assert_eq!(change.planned_state.get_string("id").as_deref(), Some("w-alpha"));

    let deleted = server
        .apply_resource_change(
            ProtocolVersion::V6,
            "test_widget",
            created.value.clone(),
            Value::Null,
            Value::Null,
        )
        .await;
    assert!(deleted.value.is_null());

    let gone = server
        .read_resource(ProtocolVersion::V6, "test_widget", created.value)
        .await;
    assert!(gone.value.is_null());
    assert!(gone.diagnostics.is_empty());
}

#[tokio::test]
async fn import_defaults_to_id_attribute() {
    let server = configured_server().await;
    let imported = server
        .import_resource_state(ProtocolVersion::V6, "test_widget", "w-beta".to_string())
        .await;
    let state = imported.value.unwrap();
    assert_eq!(state.get_string("id").as_deref(), Some("w-beta"));
    assert!(state.get("name").is_null());
}

#[tokio::test]
async fn upgrade_drops_removed_attribute() {
    let server = configured_server().await;
    let raw = RawState {
        json: Some(br#"{"id":"w-1","name":"one","full_name":"prefix one","size":3}"#.to_vec()),
        flatmap: HashMap::new(),
    };
    let upgraded = server
        .upgrade_resource_state(ProtocolVersion::V6, "test_widget", 0, raw)
        .await;
    assert!(upgraded.diagnostics.is_empty());
    assert_eq!(upgraded.value.get_string("name").as_deref(), Some("one"));
    assert_eq!(upgraded.value.get_i64("size"), Some(3));
    assert!(upgraded.value.get("zone").is_null());
}

#[tokio::test]
async fn flatmap_state_is_rejected() {
    let server = configured_server().await;
    let mut flatmap = HashMap::new();
    flatmap.insert("id".to_string(), "w-1".to_string());
    let upgraded = server
        .upgrade_resource_state(
            ProtocolVersion::V6,
            "test_widget",
            0,
            RawState { json: None, flatmap },
        )
        .await;
    assert!(upgraded.diagnostics.has_errors());
}

#[tokio::test]
async fn stop_cancels_in_flight_apply() {
    let server = configured_server().await;
    let config = Value::object([("id", Value::Null)]);

    let apply = {
        let server = server.clone();
        tokio::spawn(async move {
            server
                .apply_resource_change(
                    ProtocolVersion::V6,
                    "test_slow",
                    Value::Null,
                    Value::object([("id", Value::Unknown)]),
                    config,
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    server.stop();

    let outcome = tokio::time::timeout(Duration::from_secs(5), apply)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.value.is_null());
    assert!(outcome.diagnostics.is_empty());
}

#[tokio::test]
async fn data_source_read_and_failure() {
    let server = configured_server().await;
    let found = server
        .read_data_source(
            ProtocolVersion::V6,
            "test_lookup",
            Value::object([("name", Value::from("x")), ("id", Value::Unknown)]),
        )
        .await;
    assert_eq!(found.value.get_string("id").as_deref(), Some("l-x"));

    let missing = server
        .read_data_source(
            ProtocolVersion::V6,
            "test_lookup",
            Value::object([("name", Value::from("missing")), ("id", Value::Unknown)]),
        )
        .await;
    assert!(missing.diagnostics.has_errors());
}

#[tokio::test]
async fn v6_adapter_round_trips_msgpack() {
    use tfplugin6::provider_server::Provider as _;

    let server = configured_server().await;
    let service = ProviderServiceV6::new(server);

    let schema = service
        .get_provider_schema(Request::new(tfplugin6::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();
    assert!(schema.resource_schemas.contains_key("test_widget"));
    assert_eq!(schema.resource_schemas["test_widget"].version, 1);

    let ty = widget_schema().value_type();
    let config = widget("gamma", Value::Null, Value::Null, Value::Null);
    let encoded = tfplugin6::DynamicValue {
        msgpack: codec::encode_msgpack(&config, &ty).unwrap(),
        json: vec![],
    };
    let planned = service
        .plan_resource_change(Request::new(tfplugin6::plan_resource_change::Request {
            type_name: "test_widget".to_string(),
            prior_state: None,
            proposed_new_state: Some(encoded.clone()),
            config: Some(encoded),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(planned.diagnostics.is_empty());
    let state = codec::decode_msgpack(&planned.planned_state.unwrap().msgpack, &ty).unwrap();
    assert!(state.get("id").is_unknown());
    assert_eq!(state.get_i64("size"), Some(1));
}

#[tokio::test]
async fn v5_adapter_hides_unsupported_resources() {
    use tfplugin5::provider_server::Provider as _;

    let server = configured_server().await;
    let service = ProviderServiceV5::new(server);

    let schema = service
        .get_schema(Request::new(tfplugin5::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();
    assert!(!schema.resource_schemas.contains_key("test_modern"));

    let response = service
        .read_resource(Request::new(tfplugin5::read_resource::Request {
            type_name: "test_nope".to_string(),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].severity,
        tfplugin5::diagnostic::Severity::Error as i32
    );
}
