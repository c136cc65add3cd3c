//! Generic lifecycle driver shared by every Instana resource

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceFactory, UpdateResourceRequest,
    UpdateResourceResponse, UpgradeResourceStateRequest, UpgradeResourceStateResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::{Diagnostics, Schema, Value};

use super::{MappingError, ResourceHandle, ResourceMetaData};
use crate::api::rest_resource::RestObject;
use crate::api::{ApiError, Client};
use crate::provider_data::InstanaProviderData;

/// Adapts a [`ResourceHandle`] to the host facing [`Resource`] trait
pub struct HandleResource<H: ResourceHandle> {
    handle: H,
    resource_name: &'static str,
    client: Option<Client>,
}

impl<H: ResourceHandle> HandleResource<H> {
    pub fn new(handle: H) -> Self {
        let resource_name = handle.metadata().resource_name;
        Self {
            handle,
            resource_name,
            client: None,
        }
    }

    pub fn with_client(handle: H, client: Client) -> Self {
        Self {
            client: Some(client),
            ..Self::new(handle)
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

impl<H: ResourceHandle + Default> HandleResource<H> {
    pub fn factory() -> ResourceFactory {
        Arc::new(|| Box::new(HandleResource::new(H::default())))
    }
}

/// Simple form of a random uuid, 32 lowercase hex digits
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl<H: ResourceHandle> HandleResource<H> {
    fn client(&self) -> Result<&Client, Diagnostics> {
        self.client.as_ref().ok_or_else(|| {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error(
                "Provider not configured",
                format!(
                    "{} requires a configured provider with api_token and endpoint",
                    self.resource_name
                ),
            );
            diagnostics
        })
    }

    fn mapping_failure(&self, err: MappingError) -> Diagnostics {
        err.into_diagnostic(self.resource_name).into()
    }

    /// Cancellation is reported without diagnostics; the server keeps the
    /// prior state in that case
    fn api_failure(&self, action: &str, err: ApiError) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        match err {
            ApiError::Cancelled => {
                tracing::debug!("{} of {} cancelled", action, self.resource_name);
            }
            err if err.is_validation() => diagnostics.add_error(
                format!("Instana rejected the {} of {}", action, self.resource_name),
                err.to_string(),
            ),
            err => diagnostics.add_error(
                format!("Failed to {} {}", action, self.resource_name),
                err.to_string(),
            ),
        }
        diagnostics
    }

    fn warn_deprecated(&self, meta: &ResourceMetaData, diagnostics: &mut Diagnostics) {
        if let Some(message) = meta.deprecation_message {
            tracing::warn!("{} is deprecated: {}", self.resource_name, message);
            diagnostics.add_warning(format!("{} is deprecated", self.resource_name), message);
        }
    }

    fn read_id(&self, meta: &ResourceMetaData, state: &Value) -> Result<String, Diagnostics> {
        state
            .get_non_empty_string(meta.id_attribute())
            .ok_or_else(|| {
                let mut diagnostics = Diagnostics::new();
                diagnostics.add_error(
                    format!("Resource ID of {} is missing", self.resource_name),
                    format!(
                        "The state of {} carries no {} to address the remote object",
                        self.resource_name,
                        meta.id_attribute()
                    ),
                );
                diagnostics
            })
    }

    async fn do_create(&self, ctx: &Context, mut plan: Value) -> Result<Value, Diagnostics> {
        let meta = self.handle.metadata();
        let client = self.client()?;

        if !meta.skip_id_generation {
            plan.set("id", Value::String(generate_id()));
        }
        self.handle
            .set_computed(&mut plan)
            .map_err(|e| self.mapping_failure(e))?;

        let object = self
            .handle
            .state_to_object(&plan, &Value::Null)
            .map_err(|e| self.mapping_failure(e))?;
        let created = self
            .handle
            .rest_resource(client)
            .create(ctx, &object)
            .await
            .map_err(|e| self.api_failure("create", e))?;
        tracing::info!("Created {} {}", self.resource_name, created.id());

        self.handle
            .object_to_state(&plan, &created)
            .map_err(|e| self.mapping_failure(e))
    }

    async fn do_read(&self, ctx: &Context, state: &Value) -> Result<Option<Value>, Diagnostics> {
        let meta = self.handle.metadata();
        let id = self.read_id(&meta, state)?;
        let client = self.client()?;

        tracing::debug!("Reading {} {}", self.resource_name, id);
        match self.handle.rest_resource(client).get_one(ctx, &id).await {
            Ok(object) => self
                .handle
                .object_to_state(state, &object)
                .map(Some)
                .map_err(|e| self.mapping_failure(e)),
            Err(ApiError::NotFound) => {
                tracing::info!("{} {} not found", self.resource_name, id);
                Ok(None)
            }
            Err(e) => Err(self.api_failure("read", e)),
        }
    }

    async fn do_update(
        &self,
        ctx: &Context,
        plan: &Value,
        prior: &Value,
    ) -> Result<Value, Diagnostics> {
        let meta = self.handle.metadata();
        if meta.create_only {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error(
                format!("Update is not supported for {}", self.resource_name),
                format!(
                    "{} objects are immutable in Instana; change the configuration so the object is replaced",
                    self.resource_name
                ),
            );
            return Err(diagnostics);
        }
        let client = self.client()?;

        let object = self
            .handle
            .state_to_object(plan, prior)
            .map_err(|e| self.mapping_failure(e))?;
        let updated = self
            .handle
            .rest_resource(client)
            .update(ctx, &object)
            .await
            .map_err(|e| self.api_failure("update", e))?;
        tracing::info!("Updated {} {}", self.resource_name, updated.id());

        self.handle
            .object_to_state(plan, &updated)
            .map_err(|e| self.mapping_failure(e))
    }

    async fn do_delete(&self, ctx: &Context, state: &Value) -> Result<(), Diagnostics> {
        let meta = self.handle.metadata();
        let client = self.client()?;
        let rest = self.handle.rest_resource(client);

        let result = match self.handle.state_to_object(state, state) {
            Ok(object) => rest.delete(ctx, &object).await,
            Err(e) => {
                tracing::debug!("Deleting {} by id only: {}", self.resource_name, e);
                let id = self.read_id(&meta, state)?;
                rest.delete_by_id(ctx, &id).await
            }
        };
        match result {
            Ok(()) => {
                tracing::info!("Deleted {}", self.resource_name);
                Ok(())
            }
            Err(ApiError::NotFound) => {
                tracing::info!("{} already gone", self.resource_name);
                Ok(())
            }
            Err(e) => Err(self.api_failure("delete", e)),
        }
    }

    fn upgrade(&self, version: i64, raw_state: Value) -> Result<Value, MappingError> {
        let current = self.handle.metadata().schema_version();
        let mut upgraders = self.handle.state_upgraders();
        upgraders.sort_by_key(|u| u.from_version);

        upgraders
            .into_iter()
            .filter(|u| u.from_version >= version && u.from_version < current)
            .try_fold(raw_state, |state, upgrader| {
                tracing::debug!(
                    "Upgrading {} state from version {}",
                    self.resource_name,
                    upgrader.from_version
                );
                (upgrader.upgrade)(state)
            })
    }
}

#[async_trait]
impl<H: ResourceHandle> Resource for HandleResource<H> {
    fn type_name(&self) -> &str {
        self.resource_name
    }

    fn schema(&self) -> Schema {
        let meta = self.handle.metadata();
        let mut schema = meta.schema;
        if meta.deprecation_message.is_some() {
            schema.block.deprecated = true;
        }
        schema
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = Diagnostics::new();
        if let Some(data) = request.provider_data {
            match data.downcast_ref::<InstanaProviderData>() {
                Some(data) => self.client = Some(data.client.clone()),
                None => diagnostics.add_error(
                    "Unexpected provider data",
                    format!("{} received provider data of an unknown type", self.resource_name),
                ),
            }
        }
        ConfigureResourceResponse { diagnostics }
    }

    /// Surfaces malformed user input before any REST call; values that
    /// are still unknown are checked at apply time
    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = Diagnostics::new();
        if request.config.is_wholly_known() {
            if let Err(err @ MappingError::ParseError { .. }) =
                self.handle.state_to_object(&request.config, &Value::Null)
            {
                diagnostics.push(err.into_diagnostic(self.resource_name));
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = Diagnostics::new();
        self.warn_deprecated(&self.handle.metadata(), &mut diagnostics);

        match self.do_create(&ctx, request.planned_state).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(errors) => {
                diagnostics.extend(errors);
                CreateResourceResponse {
                    new_state: Value::Null,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.do_read(&ctx, &request.current_state).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: Diagnostics::new(),
            },
            Err(diagnostics) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = Diagnostics::new();
        self.warn_deprecated(&self.handle.metadata(), &mut diagnostics);

        match self
            .do_update(&ctx, &request.planned_state, &request.prior_state)
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(errors) => {
                diagnostics.extend(errors);
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = Diagnostics::new();
        self.warn_deprecated(&self.handle.metadata(), &mut diagnostics);

        if let Err(errors) = self.do_delete(&ctx, &request.prior_state).await {
            diagnostics.extend(errors);
        }
        DeleteResourceResponse { diagnostics }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let meta = self.handle.metadata();
        let mut state = Value::Null;
        state.set(meta.id_attribute(), Value::String(request.id.clone()));

        match self.do_read(&ctx, &state).await {
            Ok(Some(state)) => ImportResourceStateResponse {
                state: Some(state),
                diagnostics: Diagnostics::new(),
            },
            Ok(None) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.add_error(
                    "Cannot import non-existent remote object",
                    format!(
                        "No {} with {} '{}' exists in Instana",
                        self.resource_name,
                        meta.id_attribute(),
                        request.id
                    ),
                );
                ImportResourceStateResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(diagnostics) => ImportResourceStateResponse {
                state: None,
                diagnostics,
            },
        }
    }

    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        match self.upgrade(request.version, request.raw_state) {
            Ok(upgraded_state) => UpgradeResourceStateResponse {
                upgraded_state,
                diagnostics: Diagnostics::new(),
            },
            Err(e) => UpgradeResourceStateResponse {
                upgraded_state: Value::Null,
                diagnostics: self.mapping_failure(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Flavor, RestObject, RestResource};
    use crate::resourcehandle::{drop_attributes, StateUpgrader};
    use mockito::{Matcher, Server};
    use serde::{Deserialize, Serialize};
    use tfplug::{AttributeBuilder, AttributePath, SchemaBuilder};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Widget {
        id: String,
        label: String,
    }

    impl RestObject for Widget {
        fn id(&self) -> &str {
            &self.id
        }
    }

    #[derive(Default)]
    struct WidgetHandle {
        create_only: bool,
    }

    impl ResourceHandle for WidgetHandle {
        type Object = Widget;

        fn metadata(&self) -> ResourceMetaData {
            let schema = SchemaBuilder::new()
                .version(2)
                .attribute(AttributeBuilder::string("id").computed().build())
                .attribute(AttributeBuilder::string("label").required().build())
                .build();
            let meta = ResourceMetaData::new("instana_widget", schema);
            if self.create_only {
                meta.create_only()
            } else {
                meta
            }
        }

        fn rest_resource(&self, client: &Client) -> RestResource<Widget> {
            RestResource::new(client.clone(), "/api/widgets", Flavor::PutPut)
        }

        fn state_to_object(&self, state: &Value, _prior: &Value) -> Result<Widget, MappingError> {
            let label = state.get_string("label").unwrap_or_default();
            if label.contains('!') {
                return Err(MappingError::parse(
                    AttributePath::new("label"),
                    "label must not shout",
                ));
            }
            Ok(Widget {
                id: state.get_string("id").unwrap_or_default(),
                label,
            })
        }

        fn object_to_state(&self, _state: &Value, object: &Widget) -> Result<Value, MappingError> {
            Ok(Value::object([
                ("id", Value::from(object.id.as_str())),
                ("label", Value::from(object.label.as_str())),
            ]))
        }

        fn state_upgraders(&self) -> Vec<StateUpgrader> {
            vec![
                StateUpgrader::new(1, |mut state| {
                    state.set("label", Value::from("from-1"));
                    Ok(state)
                }),
                StateUpgrader::new(0, |state| Ok(drop_attributes(state, &["full_label"]))),
            ]
        }
    }

    fn engine(server: &Server) -> HandleResource<WidgetHandle> {
        let client = Client::new(&server.url(), "token", false).unwrap();
        HandleResource::with_client(WidgetHandle::default(), client)
    }

    fn state(id: &str, label: &str) -> Value {
        Value::object([("id", Value::from(id)), ("label", Value::from(label))])
    }

    #[tokio::test]
    async fn create_generates_a_simple_uuid() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", Matcher::Regex(r"^/api/widgets/[0-9a-f]{32}$".to_string()))
            .with_body_from_request(|request| request.body().unwrap().clone())
            .create_async()
            .await;

        let resp = engine(&server)
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "instana_widget".to_string(),
                    planned_state: Value::object([
                        ("id", Value::Unknown),
                        ("label", Value::from("w")),
                    ]),
                    config: Value::Null,
                },
            )
            .await;

        assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
        let id = resp.new_state.get_string("id").unwrap();
        assert_eq!(id.len(), 32);
        assert_eq!(resp.new_state.get_string("label").as_deref(), Some("w"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_vanished_object_yields_no_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/widgets/w1")
            .with_status(404)
            .create_async()
            .await;

        let resp = engine(&server)
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "instana_widget".to_string(),
                    current_state: state("w1", "w"),
                },
            )
            .await;
        assert!(resp.new_state.is_none());
        assert!(resp.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn read_without_id_is_an_error() {
        let server = Server::new_async().await;
        let resp = engine(&server)
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "instana_widget".to_string(),
                    current_state: state("", "w"),
                },
            )
            .await;
        let diag = resp.diagnostics.errors().next().unwrap();
        assert_eq!(diag.summary, "Resource ID of instana_widget is missing");
    }

    #[tokio::test]
    async fn delete_of_missing_object_succeeds() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/widgets/w1")
            .with_status(404)
            .create_async()
            .await;

        let resp = engine(&server)
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "instana_widget".to_string(),
                    prior_state: state("w1", "w"),
                },
            )
            .await;
        assert!(!resp.diagnostics.has_errors());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn import_of_missing_object_fails() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/widgets/nope")
            .with_status(404)
            .create_async()
            .await;

        let resp = engine(&server)
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "instana_widget".to_string(),
                    id: "nope".to_string(),
                },
            )
            .await;
        assert!(resp.state.is_none());
        let diag = resp.diagnostics.errors().next().unwrap();
        assert_eq!(diag.summary, "Cannot import non-existent remote object");
    }

    #[tokio::test]
    async fn create_only_handles_reject_update() {
        let server = Server::new_async().await;
        let client = Client::new(&server.url(), "token", false).unwrap();
        let engine = HandleResource::with_client(WidgetHandle { create_only: true }, client);

        let resp = engine
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "instana_widget".to_string(),
                    prior_state: state("w1", "a"),
                    planned_state: state("w1", "b"),
                    config: Value::Null,
                },
            )
            .await;
        let diag = resp.diagnostics.errors().next().unwrap();
        assert!(diag.summary.contains("instana_widget"));
        assert_eq!(resp.new_state, state("w1", "a"));
    }

    #[tokio::test]
    async fn platform_validation_errors_are_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/widgets/w1")
            .with_status(422)
            .with_body("label too long")
            .create_async()
            .await;

        let resp = engine(&server)
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "instana_widget".to_string(),
                    prior_state: state("w1", "a"),
                    planned_state: state("w1", "b"),
                    config: Value::Null,
                },
            )
            .await;
        let diag = resp.diagnostics.errors().next().unwrap();
        assert!(diag.detail.contains("label too long"));
    }

    #[tokio::test]
    async fn cancelled_operations_carry_no_diagnostics() {
        let server = Server::new_async().await;
        let ctx = Context::new();
        ctx.cancel();

        let resp = engine(&server)
            .update(
                ctx,
                UpdateResourceRequest {
                    type_name: "instana_widget".to_string(),
                    prior_state: state("w1", "a"),
                    planned_state: state("w1", "b"),
                    config: Value::Null,
                },
            )
            .await;
        assert!(resp.diagnostics.is_empty());
        assert_eq!(resp.new_state, state("w1", "a"));
    }

    #[tokio::test]
    async fn validate_reports_parse_errors_on_the_attribute() {
        let server = Server::new_async().await;
        let resp = engine(&server)
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "instana_widget".to_string(),
                    config: Value::object([("id", Value::Null), ("label", Value::from("hey!"))]),
                },
            )
            .await;
        let diag = resp.diagnostics.errors().next().unwrap();
        assert_eq!(diag.attribute, Some(AttributePath::new("label")));
    }

    #[tokio::test]
    async fn upgraders_apply_in_ascending_order_from_stored_version() {
        let server = Server::new_async().await;
        let engine = engine(&server);
        let stored = Value::object([
            ("id", Value::from("w1")),
            ("label", Value::from("old")),
            ("full_label", Value::from("x old")),
        ]);

        let from_zero = engine
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: "instana_widget".to_string(),
                    version: 0,
                    raw_state: stored.clone(),
                },
            )
            .await;
        assert_eq!(from_zero.upgraded_state, state("w1", "from-1"));

        let from_one = engine
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: "instana_widget".to_string(),
                    version: 1,
                    raw_state: stored,
                },
            )
            .await;
        assert_eq!(
            from_one.upgraded_state.get("full_label").as_str(),
            Some("x old")
        );
        assert_eq!(from_one.upgraded_state.get_string("label").as_deref(), Some("from-1"));
    }

    #[tokio::test]
    async fn reapplying_the_upgrade_chain_changes_nothing() {
        let server = Server::new_async().await;
        let engine = engine(&server);
        let upgrade = |raw_state: Value| {
            engine.upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: "instana_widget".to_string(),
                    version: 0,
                    raw_state,
                },
            )
        };

        let once = upgrade(Value::object([
            ("id", Value::from("w1")),
            ("label", Value::from("old")),
            ("full_label", Value::from("x old")),
        ]))
        .await;
        assert!(!once.diagnostics.has_errors(), "{:?}", once.diagnostics);
        let twice = upgrade(once.upgraded_state.clone()).await;

        assert!(!twice.diagnostics.has_errors(), "{:?}", twice.diagnostics);
        assert_eq!(twice.upgraded_state, once.upgraded_state);
    }
}
