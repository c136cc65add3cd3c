//! Typed records of the Instana REST API

pub mod alert_config;
pub mod alerting_channel;
pub mod alerting_config;
pub mod api_token;
pub mod application_config;
pub mod automation;
pub mod custom_dashboard;
pub mod event_specification;
pub mod group;
pub mod lookups;
pub mod sli_config;
pub mod slo;
pub mod tag_filter;
pub mod website_monitoring;

pub use alert_config::{
    ApplicationAlertConfig, InfraAlertConfig, LogAlertConfig, MobileAlertConfig,
    SyntheticAlertConfig, WebsiteAlertConfig,
};
pub use alerting_channel::{AlertingChannel, ChannelKind};
pub use alerting_config::{
    AlertingConfiguration, CustomPayloadField, DynamicFieldValue, EventFilteringConfiguration,
};
pub use api_token::ApiToken;
pub use application_config::{AccessRule, ApplicationConfig};
pub use automation::{AutomationAction, AutomationPolicy};
pub use custom_dashboard::CustomDashboard;
pub use event_specification::{BuiltinEventSpecification, CustomEventSpecification};
pub use group::Group;
pub use lookups::{HostAgent, SyntheticLocation, User};
pub use sli_config::SliConfig;
pub use slo::{SloAlertConfig, SloConfig, SloCorrectionConfig};
pub use tag_filter::TagFilter;
pub use website_monitoring::WebsiteMonitoringConfig;
