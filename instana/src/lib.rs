pub mod api;
pub mod data_sources;
pub mod json;
pub mod payload;
pub mod provider_data;
pub mod resourcehandle;
pub mod resources;
pub mod tagfilter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceFactory;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse};
use tfplug::{
    AttributeBuilder, AttributePath, Diagnostics, Provider, ResourceFactory, Schema,
    SchemaBuilder, Value,
};

use provider_data::InstanaProviderData;

pub const API_TOKEN_ENV: &str = "INSTANA_API_TOKEN";
pub const ENDPOINT_ENV: &str = "INSTANA_ENDPOINT";
pub const TLS_SKIP_VERIFY_ENV: &str = "INSTANA_TLS_SKIP_VERIFY";

const DEPRECATED_NAME_ATTRIBUTES: [&str; 2] = ["default_name_prefix", "default_name_suffix"];

/// Connection settings after environment fallbacks
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_token: String,
    pub endpoint: String,
    pub tls_skip_verify: bool,
}

impl ProviderSettings {
    /// Config values win over the environment; every missing setting is
    /// reported, not just the first
    pub fn from_config(config: &Value) -> Result<Self, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let mut required = |name: &str, env: &str| {
            let value = config
                .get_non_empty_string(name)
                .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()));
            if value.is_none() {
                diagnostics.add_attribute_error(
                    &AttributePath::new(name),
                    format!("Missing {}", name),
                    format!("{} must be set in the provider configuration or via {}", name, env),
                );
            }
            value
        };
        let api_token = required("api_token", API_TOKEN_ENV);
        let endpoint = required("endpoint", ENDPOINT_ENV);

        let tls_skip_verify = match config.get_bool("tls_skip_verify") {
            Some(flag) => flag,
            None => match std::env::var(TLS_SKIP_VERIFY_ENV) {
                Ok(raw) => raw.trim().parse::<bool>().unwrap_or_else(|_| {
                    diagnostics.add_attribute_error(
                        &AttributePath::new("tls_skip_verify"),
                        "Invalid tls_skip_verify",
                        format!("{} must be true or false, got '{}'", TLS_SKIP_VERIFY_ENV, raw),
                    );
                    false
                }),
                Err(_) => false,
            },
        };

        match (api_token, endpoint) {
            (Some(api_token), Some(endpoint)) if !diagnostics.has_errors() => Ok(Self {
                api_token,
                endpoint,
                tls_skip_verify,
            }),
            _ => Err(diagnostics),
        }
    }
}

#[derive(Default)]
pub struct InstanaProvider;

impl InstanaProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for InstanaProvider {
    fn type_name(&self) -> &str {
        "instana"
    }

    fn schema(&self) -> Schema {
        let mut builder = SchemaBuilder::new()
            .description("Manages Instana configuration through its REST API")
            .attribute(
                AttributeBuilder::string("api_token")
                    .optional()
                    .sensitive()
                    .description("API token used to authenticate; falls back to INSTANA_API_TOKEN")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("endpoint")
                    .optional()
                    .description("Instana backend host or URL; falls back to INSTANA_ENDPOINT")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("tls_skip_verify")
                    .optional()
                    .description("Skip verification of the backend's TLS certificate")
                    .build(),
            );
        for name in DEPRECATED_NAME_ATTRIBUTES {
            let mut attribute = AttributeBuilder::string(name)
                .optional()
                .description("Deprecated and ignored")
                .build();
            attribute.deprecated = true;
            builder = builder.attribute(attribute);
        }
        builder.build()
    }

    async fn configure(
        &self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = Diagnostics::new();
        for name in DEPRECATED_NAME_ATTRIBUTES {
            if request.config.get_string(name).is_some() {
                tracing::warn!("{} is deprecated and has no effect", name);
                diagnostics.add_attribute_warning(
                    &AttributePath::new(name),
                    format!("{} is deprecated", name),
                    "The attribute is ignored and will be removed in a future release",
                );
            }
        }

        let settings = match ProviderSettings::from_config(&request.config) {
            Ok(settings) => settings,
            Err(errors) => {
                diagnostics.extend(errors);
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        match api::Client::new(
            &settings.endpoint,
            &settings.api_token,
            settings.tls_skip_verify,
        ) {
            Ok(client) => {
                tracing::info!(endpoint = %client.base_url(), "Instana provider configured");
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(InstanaProviderData::new(client))),
                }
            }
            Err(e) => {
                diagnostics.add_error("Failed to create Instana API client", e.to_string());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        resources::factories()
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        data_sources::factories()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(API_TOKEN_ENV);
        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(TLS_SKIP_VERIFY_ENV);
    }

    fn request(config: Value) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_from_env_vars() {
        clear_env();
        std::env::set_var(API_TOKEN_ENV, "secret");
        std::env::set_var(ENDPOINT_ENV, "tenant.instana.io");
        std::env::set_var(TLS_SKIP_VERIFY_ENV, "true");

        let response = InstanaProvider::new()
            .configure(Context::new(), request(Value::Null))
            .await;
        assert!(!response.diagnostics.has_errors());
        let data = response.provider_data.unwrap();
        let data = data.downcast_ref::<InstanaProviderData>().unwrap();
        assert_eq!(data.client.base_url(), "https://tenant.instana.io");

        clear_env();
    }

    #[test]
    #[serial]
    fn config_values_win_over_env() {
        clear_env();
        std::env::set_var(ENDPOINT_ENV, "env.instana.io");

        let settings = ProviderSettings::from_config(&Value::object([
            ("api_token", Value::from("config-token")),
            ("endpoint", Value::from("config.instana.io")),
            ("tls_skip_verify", Value::Null),
        ]))
        .unwrap();
        assert_eq!(
            settings,
            ProviderSettings {
                api_token: "config-token".to_string(),
                endpoint: "config.instana.io".to_string(),
                tls_skip_verify: false,
            }
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn missing_settings_name_attribute_and_env_var() {
        clear_env();
        let errors = ProviderSettings::from_config(&Value::Null).unwrap_err();
        let details: Vec<_> = errors.errors().map(|d| d.detail.clone()).collect();
        assert_eq!(details.len(), 2);
        assert!(details[0].contains("api_token") && details[0].contains(API_TOKEN_ENV));
        assert!(details[1].contains("endpoint") && details[1].contains(ENDPOINT_ENV));
    }

    #[test]
    #[serial]
    fn malformed_tls_flag_is_rejected() {
        clear_env();
        std::env::set_var(TLS_SKIP_VERIFY_ENV, "sometimes");
        let errors = ProviderSettings::from_config(&Value::object([
            ("api_token", Value::from("t")),
            ("endpoint", Value::from("e.instana.io")),
        ]))
        .unwrap_err();
        assert_eq!(
            errors.iter().next().and_then(|d| d.attribute.clone()),
            Some(AttributePath::new("tls_skip_verify"))
        );
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn deprecated_name_prefix_only_warns() {
        clear_env();
        let response = InstanaProvider::new()
            .configure(
                Context::new(),
                request(Value::object([
                    ("api_token", Value::from("t")),
                    ("endpoint", Value::from("e.instana.io")),
                    ("default_name_prefix", Value::from("[tf]")),
                ])),
            )
            .await;
        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.provider_data.is_some());
    }

    #[test]
    fn provider_registers_resources_and_data_sources() {
        let provider = InstanaProvider::new();
        assert_eq!(provider.resources().len(), 21);
        assert_eq!(provider.data_sources().len(), 7);
        assert!(provider
            .schema()
            .block
            .attributes
            .iter()
            .any(|a| a.name == "api_token" && a.sensitive));
    }
}
