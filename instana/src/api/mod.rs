//! REST bindings of the Instana API

pub mod client;
pub mod error;
pub mod models;
pub mod pool;
pub mod rest_resource;

pub use client::{normalize_endpoint, resource_path, Client, RetryConfig};
pub use error::{ApiError, NOT_FOUND_MESSAGE};
pub use rest_resource::{Flavor, RestObject, RestResource};

use models::*;

pub const ALERTING_CHANNELS_PATH: &str = "/api/events/settings/alertingChannels";
pub const ALERTS_PATH: &str = "/api/events/settings/alerts";
pub const APPLICATION_ALERT_CONFIGS_PATH: &str = "/api/events/settings/application-alert-configs";
pub const GLOBAL_APPLICATION_ALERT_CONFIGS_PATH: &str =
    "/api/events/settings/global-alert-configs/applications";
pub const API_TOKENS_PATH: &str = "/api/settings/api-tokens";
pub const APPLICATION_CONFIGS_PATH: &str = "/api/application-monitoring/settings/application";
pub const AUTOMATION_ACTIONS_PATH: &str = "/api/automation/actions";
pub const AUTOMATION_POLICIES_PATH: &str = "/api/automation/policies";
pub const CUSTOM_DASHBOARDS_PATH: &str = "/api/custom-dashboard";
pub const CUSTOM_EVENT_SPECIFICATIONS_PATH: &str =
    "/api/events/settings/event-specifications/custom";
pub const BUILTIN_EVENT_SPECIFICATIONS_PATH: &str =
    "/api/events/settings/event-specifications/built-in";
pub const INFRA_ALERT_CONFIGS_PATH: &str = "/api/events/settings/infra-alert-configs";
pub const LOG_ALERT_CONFIGS_PATH: &str = "/api/events/settings/global-alert-configs/logs";
pub const MOBILE_ALERT_CONFIGS_PATH: &str = "/api/events/settings/mobile-app-alert-configs";
pub const GROUPS_PATH: &str = "/api/settings/rbac/groups";
pub const HOST_AGENTS_PATH: &str = "/api/host-agent";
pub const SLI_CONFIGS_PATH: &str = "/api/settings/sli";
pub const SLO_ALERT_CONFIGS_PATH: &str =
    "/api/events/settings/global-alert-configs/service-levels";
pub const SLO_CONFIGS_PATH: &str = "/api/settings/slo";
pub const SLO_CORRECTION_CONFIGS_PATH: &str = "/api/settings/correction";
pub const SYNTHETIC_ALERT_CONFIGS_PATH: &str =
    "/api/events/settings/global-alert-configs/synthetics";
pub const SYNTHETIC_LOCATIONS_PATH: &str = "/api/synthetics/settings/locations";
pub const USERS_PATH: &str = "/api/settings/users";
pub const WEBSITE_ALERT_CONFIGS_PATH: &str = "/api/events/settings/website-alert-configs";
pub const WEBSITE_MONITORING_CONFIGS_PATH: &str = "/api/website-monitoring/config";

impl Client {
    pub fn alerting_channels(&self) -> RestResource<AlertingChannel> {
        RestResource::new(self.clone(), ALERTING_CHANNELS_PATH, Flavor::PutPut)
    }

    pub fn alerting_configurations(&self) -> RestResource<AlertingConfiguration> {
        RestResource::new(self.clone(), ALERTS_PATH, Flavor::PutPut)
    }

    /// Application alert configs; `global` selects the collection spanning
    /// all applications
    pub fn application_alert_configs(
        &self,
        global: bool,
    ) -> RestResource<ApplicationAlertConfig> {
        let path = if global {
            GLOBAL_APPLICATION_ALERT_CONFIGS_PATH
        } else {
            APPLICATION_ALERT_CONFIGS_PATH
        };
        RestResource::new(self.clone(), path, Flavor::PostPost)
    }

    pub fn api_tokens(&self) -> RestResource<ApiToken> {
        RestResource::new(self.clone(), API_TOKENS_PATH, Flavor::PostPut)
    }

    pub fn application_configs(&self) -> RestResource<ApplicationConfig> {
        RestResource::new(self.clone(), APPLICATION_CONFIGS_PATH, Flavor::PostPut)
    }

    pub fn automation_actions(&self) -> RestResource<AutomationAction> {
        RestResource::new(self.clone(), AUTOMATION_ACTIONS_PATH, Flavor::PostPut)
    }

    pub fn automation_policies(&self) -> RestResource<AutomationPolicy> {
        RestResource::new(self.clone(), AUTOMATION_POLICIES_PATH, Flavor::PostPut)
    }

    pub fn custom_dashboards(&self) -> RestResource<CustomDashboard> {
        RestResource::new(self.clone(), CUSTOM_DASHBOARDS_PATH, Flavor::PostPut)
    }

    pub fn custom_event_specifications(&self) -> RestResource<CustomEventSpecification> {
        RestResource::new(self.clone(), CUSTOM_EVENT_SPECIFICATIONS_PATH, Flavor::PutPut)
    }

    pub fn builtin_event_specifications(&self) -> RestResource<BuiltinEventSpecification> {
        RestResource::new(
            self.clone(),
            BUILTIN_EVENT_SPECIFICATIONS_PATH,
            Flavor::ReadOnly,
        )
    }

    pub fn infra_alert_configs(&self) -> RestResource<InfraAlertConfig> {
        RestResource::new(self.clone(), INFRA_ALERT_CONFIGS_PATH, Flavor::PostPost)
    }

    pub fn log_alert_configs(&self) -> RestResource<LogAlertConfig> {
        RestResource::new(self.clone(), LOG_ALERT_CONFIGS_PATH, Flavor::PostPost)
    }

    pub fn mobile_alert_configs(&self) -> RestResource<MobileAlertConfig> {
        RestResource::new(self.clone(), MOBILE_ALERT_CONFIGS_PATH, Flavor::PostPost)
    }

    pub fn groups(&self) -> RestResource<Group> {
        RestResource::new(self.clone(), GROUPS_PATH, Flavor::PostPut)
    }

    pub fn host_agents(&self) -> RestResource<HostAgent> {
        RestResource::new(self.clone(), HOST_AGENTS_PATH, Flavor::ReadOnly)
    }

    pub fn sli_configs(&self) -> RestResource<SliConfig> {
        RestResource::new(self.clone(), SLI_CONFIGS_PATH, Flavor::PostNoUpdate)
    }

    pub fn slo_alert_configs(&self) -> RestResource<SloAlertConfig> {
        RestResource::new(self.clone(), SLO_ALERT_CONFIGS_PATH, Flavor::PostPost)
    }

    pub fn slo_configs(&self) -> RestResource<SloConfig> {
        RestResource::new(self.clone(), SLO_CONFIGS_PATH, Flavor::PostPut)
    }

    pub fn slo_correction_configs(&self) -> RestResource<SloCorrectionConfig> {
        RestResource::new(self.clone(), SLO_CORRECTION_CONFIGS_PATH, Flavor::PostPut)
    }

    pub fn synthetic_alert_configs(&self) -> RestResource<SyntheticAlertConfig> {
        RestResource::new(self.clone(), SYNTHETIC_ALERT_CONFIGS_PATH, Flavor::PostPost)
    }

    pub fn synthetic_locations(&self) -> RestResource<SyntheticLocation> {
        RestResource::new(self.clone(), SYNTHETIC_LOCATIONS_PATH, Flavor::ReadOnly)
    }

    pub fn users(&self) -> RestResource<User> {
        RestResource::new(self.clone(), USERS_PATH, Flavor::ReadOnly)
    }

    pub fn website_alert_configs(&self) -> RestResource<WebsiteAlertConfig> {
        RestResource::new(self.clone(), WEBSITE_ALERT_CONFIGS_PATH, Flavor::PostPost)
    }

    pub fn website_monitoring_configs(&self) -> RestResource<WebsiteMonitoringConfig> {
        RestResource::new(
            self.clone(),
            WEBSITE_MONITORING_CONFIGS_PATH,
            Flavor::NameQuery,
        )
    }
}
