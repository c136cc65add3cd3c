use serde::{Deserialize, Serialize};

use crate::api::RestObject;

/// Discriminator of an alerting channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Email,
    GoogleChat,
    Office365,
    OpsGenie,
    PagerDuty,
    Slack,
    Splunk,
    VictorOps,
    Webhook,
    ServiceNow,
    PrometheusWebhook,
    WebexTeamsWebhook,
    WatsonAiopsWebhook,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 13] = [
        ChannelKind::Email,
        ChannelKind::GoogleChat,
        ChannelKind::Office365,
        ChannelKind::OpsGenie,
        ChannelKind::PagerDuty,
        ChannelKind::Slack,
        ChannelKind::Splunk,
        ChannelKind::VictorOps,
        ChannelKind::Webhook,
        ChannelKind::ServiceNow,
        ChannelKind::PrometheusWebhook,
        ChannelKind::WebexTeamsWebhook,
        ChannelKind::WatsonAiopsWebhook,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            ChannelKind::Email => "EMAIL",
            ChannelKind::GoogleChat => "GOOGLE_CHAT",
            ChannelKind::Office365 => "OFFICE_365",
            ChannelKind::OpsGenie => "OPS_GENIE",
            ChannelKind::PagerDuty => "PAGER_DUTY",
            ChannelKind::Slack => "SLACK",
            ChannelKind::Splunk => "SPLUNK",
            ChannelKind::VictorOps => "VICTOR_OPS",
            ChannelKind::Webhook => "WEB_HOOK",
            ChannelKind::ServiceNow => "SERVICE_NOW_WEBHOOK",
            ChannelKind::PrometheusWebhook => "PROMETHEUS_WEBHOOK",
            ChannelKind::WebexTeamsWebhook => "WEBEX_TEAMS_WEBHOOK",
            ChannelKind::WatsonAiopsWebhook => "WATSON_AIOPS_WEBHOOK",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    /// Name of the nested block holding this kind's settings
    pub fn block_name(self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::GoogleChat => "google_chat",
            ChannelKind::Office365 => "office_365",
            ChannelKind::OpsGenie => "ops_genie",
            ChannelKind::PagerDuty => "pager_duty",
            ChannelKind::Slack => "slack",
            ChannelKind::Splunk => "splunk",
            ChannelKind::VictorOps => "victor_ops",
            ChannelKind::Webhook => "webhook",
            ChannelKind::ServiceNow => "service_now",
            ChannelKind::PrometheusWebhook => "prometheus_webhook",
            ChannelKind::WebexTeamsWebhook => "webex_teams_webhook",
            ChannelKind::WatsonAiopsWebhook => "watson_aiops_webhook",
        }
    }
}

/// Alerting channel as one flat record; `kind` decides which fields matter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingChannel {
    pub id: String,
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_integration_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_now_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_close_incidents: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl RestObject for AlertingChannel {
    fn id(&self) -> &str {
        &self.id
    }
}
