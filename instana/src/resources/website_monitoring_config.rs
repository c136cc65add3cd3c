//! instana_website_monitoring_config

use tfplug::{AttributeBuilder, SchemaBuilder, Value};

use super::{id_attribute, string_attribute};
use crate::api::models::WebsiteMonitoringConfig;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_website_monitoring_config";

#[derive(Default)]
pub struct WebsiteMonitoringConfigResource;

impl ResourceHandle for WebsiteMonitoringConfigResource {
    type Object = WebsiteMonitoringConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("Website monitored through end user beacons")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the website"))
            .attribute(
                AttributeBuilder::string("app_name")
                    .computed()
                    .description("App name derived by Instana from the website name")
                    .build(),
            )
            .build();
        // Instana assigns the id on create
        ResourceMetaData::new(RESOURCE_NAME, schema).skip_id_generation()
    }

    fn rest_resource(&self, client: &Client) -> RestResource<WebsiteMonitoringConfig> {
        client.website_monitoring_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<WebsiteMonitoringConfig, MappingError> {
        Ok(WebsiteMonitoringConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            app_name: state.get_string("app_name").unwrap_or_default(),
        })
    }

    fn object_to_state(
        &self,
        _state: &Value,
        website: &WebsiteMonitoringConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(website.id.as_str())),
            ("name", Value::from(website.name.as_str())),
            ("app_name", Value::from(website.app_name.as_str())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_app_name_is_sent_empty() {
        let state = Value::object([
            ("id", Value::Unknown),
            ("name", Value::from("shop")),
            ("app_name", Value::Unknown),
        ]);
        let website = WebsiteMonitoringConfigResource
            .state_to_object(&state, &Value::Null)
            .unwrap();
        assert_eq!(website.name, "shop");
        assert_eq!(website.id, "");
        assert_eq!(website.app_name, "");
    }

    #[test]
    fn returned_app_name_lands_in_state() {
        let website = WebsiteMonitoringConfig {
            id: "w1".to_string(),
            name: "shop".to_string(),
            app_name: "shop-app".to_string(),
        };
        let state = WebsiteMonitoringConfigResource
            .object_to_state(&Value::Null, &website)
            .unwrap();
        assert_eq!(state.get_string("app_name").as_deref(), Some("shop-app"));
        assert!(WebsiteMonitoringConfigResource.metadata().skip_id_generation);
    }
}
