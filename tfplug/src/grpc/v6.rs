//! tfplugin6 service adapter

use super::ProviderServer;
use crate::provider::{ProtocolVersion, Provider};
use std::sync::Arc;
use tonic::{Request, Response, Status};

proto_conversions!(tfplugin6);

use pb::provider_server::Provider as ProtoProvider;
use pb::{
    apply_resource_change, configure_provider, get_metadata, get_provider_schema,
    import_resource_state, plan_resource_change, read_data_source, read_resource,
    stop_provider, upgrade_resource_state, validate_data_resource_config,
    validate_provider_config, validate_resource_config,
};

const PROTOCOL: ProtocolVersion = ProtocolVersion::V6;

pub struct ProviderServiceV6<P: Provider + 'static> {
    core: Arc<ProviderServer<P>>,
}

impl<P: Provider + 'static> ProviderServiceV6<P> {
    pub fn new(core: Arc<ProviderServer<P>>) -> Self {
        Self { core }
    }

    fn resource_schema(&self, type_name: &str) -> Option<&Schema> {
        self.core.resource_schema(type_name)
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProtoProvider for ProviderServiceV6<P> {
    async fn get_metadata(
        &self,
        _request: Request<get_metadata::Request>,
    ) -> std::result::Result<Response<get_metadata::Response>, Status> {
        let catalogue = self.core.catalogue(PROTOCOL);
        Ok(Response::new(get_metadata::Response {
            server_capabilities: Some(pb::ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: false,
                move_resource_state: false,
            }),
            diagnostics: vec![],
            data_sources: catalogue
                .data_sources
                .keys()
                .map(|name| get_metadata::DataSourceMetadata {
                    type_name: name.to_string(),
                })
                .collect(),
            resources: catalogue
                .resources
                .keys()
                .map(|name| get_metadata::ResourceMetadata {
                    type_name: name.to_string(),
                })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<get_provider_schema::Request>,
    ) -> std::result::Result<Response<get_provider_schema::Response>, Status> {
        let catalogue = self.core.catalogue(PROTOCOL);
        Ok(Response::new(get_provider_schema::Response {
            provider: Some(schema_to_proto(catalogue.provider)),
            resource_schemas: catalogue
                .resources
                .iter()
                .map(|(name, schema)| (name.to_string(), schema_to_proto(schema)))
                .collect(),
            data_source_schemas: catalogue
                .data_sources
                .iter()
                .map(|(name, schema)| (name.to_string(), schema_to_proto(schema)))
                .collect(),
            diagnostics: vec![],
            provider_meta: None,
            server_capabilities: Some(pb::ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: false,
                move_resource_state: false,
            }),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<validate_provider_config::Request>,
    ) -> std::result::Result<Response<validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = match decode_for(
            Some(self.core.provider_schema()),
            "provider",
            "provider",
            req.config.as_ref(),
        ) {
            Ok(config) => config,
            Err(diagnostics) => {
                return Ok(Response::new(validate_provider_config::Response { diagnostics }))
            }
        };

        let diagnostics = self.core.validate_provider_config(config).await;
        Ok(Response::new(validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<validate_resource_config::Request>,
    ) -> std::result::Result<Response<validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let config = match decode_for(
            self.resource_schema(&req.type_name),
            "resource",
            &req.type_name,
            req.config.as_ref(),
        ) {
            Ok(config) => config,
            Err(diagnostics) => {
                return Ok(Response::new(validate_resource_config::Response { diagnostics }))
            }
        };

        let diagnostics = self
            .core
            .validate_resource_config(PROTOCOL, &req.type_name, config)
            .await;
        Ok(Response::new(validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let config = match decode_for(
            self.core.data_source_schema(&req.type_name),
            "data source",
            &req.type_name,
            req.config.as_ref(),
        ) {
            Ok(config) => config,
            Err(diagnostics) => {
                return Ok(Response::new(validate_data_resource_config::Response {
                    diagnostics,
                }))
            }
        };

        let diagnostics = self
            .core
            .validate_data_source_config(PROTOCOL, &req.type_name, config)
            .await;
        Ok(Response::new(validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let raw_state = raw_state_from_proto(req.raw_state);
        let outcome = self
            .core
            .upgrade_resource_state(PROTOCOL, &req.type_name, req.version, raw_state)
            .await;

        let mut diagnostics = diagnostics_to_proto(outcome.diagnostics);
        let schema = self.resource_schema(&req.type_name);
        let upgraded_state = match encode_for(schema, &outcome.value) {
            Ok(state) => state,
            Err(errors) => {
                diagnostics.extend(errors);
                None
            }
        };
        Ok(Response::new(upgrade_resource_state::Response {
            upgraded_state,
            diagnostics,
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<configure_provider::Request>,
    ) -> std::result::Result<Response<configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = match decode_for(
            Some(self.core.provider_schema()),
            "provider",
            "provider",
            req.config.as_ref(),
        ) {
            Ok(config) => config,
            Err(diagnostics) => {
                return Ok(Response::new(configure_provider::Response { diagnostics }))
            }
        };

        let diagnostics = self
            .core
            .configure_provider(req.terraform_version, config)
            .await;
        Ok(Response::new(configure_provider::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<read_resource::Request>,
    ) -> std::result::Result<Response<read_resource::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name);
        let current_state =
            match decode_for(schema, "resource", &req.type_name, req.current_state.as_ref()) {
                Ok(state) => state,
                Err(diagnostics) => {
                    return Ok(Response::new(read_resource::Response {
                        new_state: req.current_state,
                        diagnostics,
                        private: req.private,
                        deferred: None,
                    }))
                }
            };

        let outcome = self
            .core
            .read_resource(PROTOCOL, &req.type_name, current_state)
            .await;

        let mut diagnostics = diagnostics_to_proto(outcome.diagnostics);
        let new_state = match encode_for(schema, &outcome.value) {
            Ok(state) => state,
            Err(errors) => {
                diagnostics.extend(errors);
                req.current_state
            }
        };
        Ok(Response::new(read_resource::Response {
            new_state,
            diagnostics,
            private: req.private,
            deferred: None,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<plan_resource_change::Request>,
    ) -> std::result::Result<Response<plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name);
        let decoded = decode_for(schema, "resource", &req.type_name, req.prior_state.as_ref())
            .and_then(|prior| {
                let proposed = decode_for(
                    schema,
                    "resource",
                    &req.type_name,
                    req.proposed_new_state.as_ref(),
                )?;
                let config = decode_for(schema, "resource", &req.type_name, req.config.as_ref())?;
                Ok((prior, proposed, config))
            });
        let (prior_state, proposed_new_state, config) = match decoded {
            Ok(values) => values,
            Err(diagnostics) => {
                return Ok(Response::new(plan_resource_change::Response {
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let change = self
            .core
            .plan_resource_change(
                PROTOCOL,
                &req.type_name,
                prior_state,
                proposed_new_state,
                config,
            )
            .await;

        let mut diagnostics = diagnostics_to_proto(change.diagnostics);
        let planned_state = match encode_for(schema, &change.planned_state) {
            Ok(state) => state,
            Err(errors) => {
                diagnostics.extend(errors);
                None
            }
        };
        Ok(Response::new(plan_resource_change::Response {
            planned_state,
            requires_replace: change.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics,
            legacy_type_system: false,
            deferred: None,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<apply_resource_change::Request>,
    ) -> std::result::Result<Response<apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name);
        let decoded = decode_for(schema, "resource", &req.type_name, req.prior_state.as_ref())
            .and_then(|prior| {
                let planned =
                    decode_for(schema, "resource", &req.type_name, req.planned_state.as_ref())?;
                let config = decode_for(schema, "resource", &req.type_name, req.config.as_ref())?;
                Ok((prior, planned, config))
            });
        let (prior_state, planned_state, config) = match decoded {
            Ok(values) => values,
            Err(diagnostics) => {
                return Ok(Response::new(apply_resource_change::Response {
                    new_state: req.prior_state,
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let outcome = self
            .core
            .apply_resource_change(PROTOCOL, &req.type_name, prior_state, planned_state, config)
            .await;

        let mut diagnostics = diagnostics_to_proto(outcome.diagnostics);
        let new_state = match encode_for(schema, &outcome.value) {
            Ok(state) => state,
            Err(errors) => {
                diagnostics.extend(errors);
                req.prior_state
            }
        };
        Ok(Response::new(apply_resource_change::Response {
            new_state,
            private: req.planned_private,
            diagnostics,
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<import_resource_state::Request>,
    ) -> std::result::Result<Response<import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let outcome = self
            .core
            .import_resource_state(PROTOCOL, &req.type_name, req.id)
            .await;

        let mut diagnostics = diagnostics_to_proto(outcome.diagnostics);
        let mut imported_resources = Vec::new();
        if let Some(state) = outcome.value {
            match encode_for(self.resource_schema(&req.type_name), &state) {
                Ok(state) => imported_resources.push(import_resource_state::ImportedResource {
                    type_name: req.type_name.clone(),
                    state,
                    private: vec![],
                }),
                Err(errors) => diagnostics.extend(errors),
            }
        }
        Ok(Response::new(import_resource_state::Response {
            imported_resources,
            diagnostics,
            deferred: None,
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<read_data_source::Request>,
    ) -> std::result::Result<Response<read_data_source::Response>, Status> {
        let req = request.into_inner();
        let schema = self.core.data_source_schema(&req.type_name);
        let config = match decode_for(schema, "data source", &req.type_name, req.config.as_ref()) {
            Ok(config) => config,
            Err(diagnostics) => {
                return Ok(Response::new(read_data_source::Response {
                    state: None,
                    diagnostics,
                    deferred: None,
                }))
            }
        };

        let outcome = self
            .core
            .read_data_source(PROTOCOL, &req.type_name, config)
            .await;

        let mut diagnostics = diagnostics_to_proto(outcome.diagnostics);
        let state = match encode_for(schema, &outcome.value) {
            Ok(state) => state,
            Err(errors) => {
                diagnostics.extend(errors);
                None
            }
        };
        Ok(Response::new(read_data_source::Response {
            state,
            diagnostics,
            deferred: None,
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<stop_provider::Request>,
    ) -> std::result::Result<Response<stop_provider::Response>, Status> {
        self.core.stop();
        Ok(Response::new(stop_provider::Response {
            error: String::new(),
        }))
    }
}
