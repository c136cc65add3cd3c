use serde::{Deserialize, Serialize};

use super::alerting_config::CustomPayloadField;
use super::tag_filter::TagFilter;
use crate::api::RestObject;

/// Prefix of client generated SLO ids
pub const SLO_ID_PREFIX: &str = "SLOTF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RbacTag {
    pub display_name: String,
    pub id: String,
}

/// What an SLO is measured on; `entity_type` decides which fields apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_synthetic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_internal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beacon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic_test_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter_expression: Option<TagFilter>,
}

/// How an SLO judges good and bad; `blueprint` and `indicator_type` select the variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloIndicator {
    pub blueprint: String,
    #[serde(rename = "type")]
    pub indicator_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_events_filter: Option<TagFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad_events_filter: Option<TagFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloTimeWindow {
    #[serde(rename = "type")]
    pub window_type: String,
    pub duration: i64,
    pub duration_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloConfig {
    pub id: String,
    pub name: String,
    pub target: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rbac_tags: Vec<RbacTag>,
    pub entity: SloEntity,
    pub indicator: SloIndicator,
    pub time_window: SloTimeWindow,
}

impl RestObject for SloConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloAlertRule {
    pub alert_type: String,
    pub metric: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloAlertThreshold {
    #[serde(rename = "type")]
    pub threshold_type: String,
    pub operator: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloAlertTimeThreshold {
    pub time_window: i64,
    pub expiry: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRateConfig {
    pub alert_window_type: String,
    pub duration: i64,
    pub duration_unit_type: String,
    pub threshold: SloAlertThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloAlertConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: i32,
    #[serde(default)]
    pub triggering: bool,
    #[serde(default)]
    pub enabled: bool,
    pub rule: SloAlertRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<SloAlertThreshold>,
    #[serde(default)]
    pub slo_ids: Vec<String>,
    #[serde(default)]
    pub alert_channel_ids: Vec<String>,
    pub time_threshold: SloAlertTimeThreshold,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub burn_rate_config: Vec<BurnRateConfig>,
    #[serde(default)]
    pub custom_payload_fields: Vec<CustomPayloadField>,
}

impl RestObject for SloAlertConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionScheduling {
    /// Epoch milliseconds
    pub start_time: i64,
    pub duration: i64,
    pub duration_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrent_rule: Option<String>,
    #[serde(default)]
    pub recurrent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloCorrectionConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    pub scheduling: CorrectionScheduling,
    #[serde(default)]
    pub slo_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RestObject for SloCorrectionConfig {
    fn id(&self) -> &str {
        &self.id
    }
}
