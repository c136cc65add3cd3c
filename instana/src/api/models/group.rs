use serde::{Deserialize, Serialize};

use crate::api::RestObject;

pub const GROUP_PERMISSIONS: &[&str] = &[
    "CAN_CONFIGURE_APPLICATIONS",
    "CAN_CONFIGURE_EUM_APPLICATIONS",
    "CAN_CONFIGURE_AGENTS",
    "CAN_VIEW_TRACE_DETAILS",
    "CAN_VIEW_LOGS",
    "CAN_CONFIGURE_SESSION_SETTINGS",
    "CAN_CONFIGURE_INTEGRATIONS",
    "CAN_CONFIGURE_GLOBAL_APPLICATION_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_SYNTHETIC_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_INFRA_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_LOG_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_ALERT_PAYLOAD",
    "CAN_CONFIGURE_MOBILE_APP_MONITORING",
    "CAN_CONFIGURE_API_TOKENS",
    "CAN_CONFIGURE_SERVICE_LEVEL_INDICATORS",
    "CAN_CONFIGURE_AUTHENTICATION_METHODS",
    "CAN_CONFIGURE_RELEASES",
    "CAN_VIEW_AUDIT_LOG",
    "CAN_CONFIGURE_EVENTS_AND_ALERTS",
    "CAN_CONFIGURE_MAINTENANCE_WINDOWS",
    "CAN_CONFIGURE_APPLICATION_SMART_ALERTS",
    "CAN_CONFIGURE_WEBSITE_SMART_ALERTS",
    "CAN_CONFIGURE_MOBILE_APP_SMART_ALERTS",
    "CAN_CONFIGURE_AGENT_RUN_MODE",
    "CAN_CONFIGURE_SERVICE_MAPPING",
    "CAN_EDIT_ALL_ACCESSIBLE_CUSTOM_DASHBOARDS",
    "CAN_CONFIGURE_USERS",
    "CAN_INSTALL_NEW_AGENTS",
    "CAN_CONFIGURE_TEAMS",
    "CAN_CREATE_PUBLIC_CUSTOM_DASHBOARDS",
    "CAN_CONFIGURE_LOG_MANAGEMENT",
    "CAN_VIEW_ACCOUNT_AND_BILLING_INFORMATION",
    "CAN_VIEW_SYNTHETIC_TESTS",
    "CAN_VIEW_SYNTHETIC_LOCATIONS",
    "CAN_CREATE_THREAD_DUMP",
    "CAN_CREATE_HEAP_DUMP",
    "CAN_CONFIGURE_DATABASE_MANAGEMENT",
    "CAN_CONFIGURE_LOG_RETENTION_PERIOD",
    "CAN_CONFIGURE_PERSONAL_API_TOKENS",
    "ACCESS_INFRASTRUCTURE_ANALYZE",
    "CAN_VIEW_LOG_VOLUME",
    "CAN_RUN_AUTOMATION_ACTIONS",
    "CAN_VIEW_SYNTHETIC_TEST_RESULTS",
    "CAN_INVOKE_ALERT_CHANNEL",
    "CAN_MANUALLY_CLOSE_ISSUE",
    "CAN_DELETE_LOGS",
    "CAN_CONFIGURE_SYNTHETIC_TESTS",
    "CAN_VIEW_BUSINESS_PROCESS_DETAILS",
    "CAN_VIEW_BIZOPS_ALERTS",
    "CAN_USE_SYNTHETIC_CREDENTIALS",
    "CAN_DELETE_AUTOMATION_ACTION_HISTORY",
    "CAN_CONFIGURE_SYNTHETIC_LOCATIONS",
    "CAN_CONFIGURE_SYNTHETIC_CREDENTIALS",
    "CAN_CONFIGURE_SUBTRACES",
    "CAN_CONFIGURE_LLM",
    "CAN_CONFIGURE_BIZOPS",
    "CAN_CONFIGURE_AUTOMATION_POLICIES",
    "CAN_CONFIGURE_AUTOMATION_ACTIONS",
];

/// Binds a scope (application, website, cluster, ...) optionally to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBinding {
    pub scope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_role_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_ids: Vec<ScopeBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_dfq_filter: Option<ScopeBinding>,
    #[serde(
        default,
        rename = "kubernetesClusterUUIDs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub kubernetes_cluster_uuids: Vec<ScopeBinding>,
    #[serde(
        default,
        rename = "kubernetesNamespaceUIDs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub kubernetes_namespace_uids: Vec<ScopeBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mobile_app_ids: Vec<ScopeBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub website_ids: Vec<ScopeBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

impl PermissionSet {
    pub fn is_empty(&self) -> bool {
        self.application_ids.is_empty()
            && self.infra_dfq_filter.is_none()
            && self.kubernetes_cluster_uuids.is_empty()
            && self.kubernetes_namespace_uids.is_empty()
            && self.mobile_app_ids.is_empty()
            && self.website_ids.is_empty()
            && self.permissions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub permission_set: PermissionSet,
}

impl RestObject for Group {
    fn id(&self) -> &str {
        &self.id
    }
}
