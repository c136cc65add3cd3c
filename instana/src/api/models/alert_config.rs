use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::alerting_config::CustomPayloadField;
use super::tag_filter::TagFilter;
use crate::api::RestObject;

pub const SEVERITY_KEY_WARNING: &str = "WARNING";
pub const SEVERITY_KEY_CRITICAL: &str = "CRITICAL";

/// Threshold of one severity, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThresholdRule {
    #[serde(rename = "staticThreshold", rename_all = "camelCase")]
    Static {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    #[serde(rename = "adaptiveBaseline", rename_all = "camelCase")]
    AdaptiveBaseline {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        deviation_factor: f64,
        adaptability: f64,
        seasonality: String,
    },
    #[serde(rename = "historicBaseline", rename_all = "camelCase")]
    HistoricBaseline {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        baseline: Vec<Vec<f64>>,
        deviation_factor: f64,
        seasonality: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_updated: Option<i64>,
    },
}

/// How long or how often a rule has to be violated before an alert opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimeThreshold {
    #[serde(rename = "requestImpact", rename_all = "camelCase")]
    RequestImpact { time_window: i64, requests: i64 },
    #[serde(rename = "violationsInPeriod", rename_all = "camelCase")]
    ViolationsInPeriod { time_window: i64, violations: i64 },
    #[serde(rename = "violationsInSequence", rename_all = "camelCase")]
    ViolationsInSequence {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_window: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        violations_count: Option<i64>,
    },
    #[serde(rename = "userImpactOfViolationsInSequence", rename_all = "camelCase")]
    UserImpactOfViolationsInSequence {
        time_window: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        impact_measurement_method: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        users: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_percentage: Option<f64>,
    },
}

/// Metric condition of an alert; `alert_type` decides which fields apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub alert_type: String,
    #[serde(default)]
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_series_aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_event_name: Option<String>,
}

/// A rule with one threshold per severity, keyed `WARNING`/`CRITICAL`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWithThresholds {
    pub rule: AlertRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_operator: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, ThresholdRule>,
}

/// Alerting channel ids per severity key
pub type AlertChannels = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedEndpoint {
    pub endpoint_id: String,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedService {
    pub service_id: String,
    pub inclusive: bool,
    #[serde(default)]
    pub endpoints: BTreeMap<String, IncludedEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedApplication {
    pub application_id: String,
    pub inclusive: bool,
    #[serde(default)]
    pub services: BTreeMap<String, IncludedService>,
}

/// Shared by application and global application alert configs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(default)]
    pub triggering: bool,
    #[serde(default)]
    pub applications: BTreeMap<String, IncludedApplication>,
    pub boundary_scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub include_internal: bool,
    #[serde(default)]
    pub include_synthetic: bool,
    pub evaluation_type: String,
    #[serde(default)]
    pub alert_channel_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alert_channels: AlertChannels,
    pub granularity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<i64>,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
    #[serde(default)]
    pub rules: Vec<RuleWithThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_threshold: Option<TimeThreshold>,
}

impl RestObject for ApplicationAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub website_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(default)]
    pub triggering: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub alert_channel_ids: Vec<String>,
    pub granularity: i64,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
    #[serde(default)]
    pub rules: Vec<RuleWithThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_threshold: Option<TimeThreshold>,
}

impl RestObject for WebsiteAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub alert_channels: AlertChannels,
    pub granularity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_threshold: Option<TimeThreshold>,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
    #[serde(default)]
    pub rules: Vec<RuleWithThresholds>,
    pub evaluation_type: String,
}

impl RestObject for InfraAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mobile_app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(default)]
    pub triggering: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub alert_channels: AlertChannels,
    pub granularity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<i64>,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
    #[serde(default)]
    pub rules: Vec<RuleWithThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_threshold: Option<TimeThreshold>,
}

impl RestObject for MobileAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Log tag the alert is split by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupByTag {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    #[serde(default)]
    pub group_by: Vec<GroupByTag>,
    #[serde(default)]
    pub alert_channels: AlertChannels,
    pub granularity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_threshold: Option<TimeThreshold>,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
    #[serde(default)]
    pub rules: Vec<RuleWithThresholds>,
}

impl RestObject for LogAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub synthetic_test_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
    pub rule: AlertRule,
    #[serde(default)]
    pub alert_channel_ids: Vec<String>,
    pub time_threshold: TimeThreshold,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<i64>,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
}

impl RestObject for SyntheticAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}
