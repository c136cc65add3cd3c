use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::RestObject;

/// Permission flags of an API token as (attribute name, wire name)
pub const API_TOKEN_PERMISSIONS: &[(&str, &str)] = &[
    ("can_configure_service_mapping", "canConfigureServiceMapping"),
    ("can_configure_eum_applications", "canConfigureEumApplications"),
    ("can_configure_mobile_app_monitoring", "canConfigureMobileAppMonitoring"),
    ("can_configure_users", "canConfigureUsers"),
    ("can_install_new_agents", "canInstallNewAgents"),
    ("can_configure_integrations", "canConfigureIntegrations"),
    ("can_configure_events_and_alerts", "canConfigureEventsAndAlerts"),
    ("can_configure_maintenance_windows", "canConfigureMaintenanceWindows"),
    ("can_configure_application_smart_alerts", "canConfigureApplicationSmartAlerts"),
    ("can_configure_website_smart_alerts", "canConfigureWebsiteSmartAlerts"),
    ("can_configure_mobile_app_smart_alerts", "canConfigureMobileAppSmartAlerts"),
    ("can_configure_api_tokens", "canConfigureApiTokens"),
    ("can_configure_agent_run_mode", "canConfigureAgentRunMode"),
    ("can_view_audit_log", "canViewAuditLog"),
    ("can_configure_agents", "canConfigureAgents"),
    ("can_configure_authentication_methods", "canConfigureAuthenticationMethods"),
    ("can_configure_applications", "canConfigureApplications"),
    ("can_configure_teams", "canConfigureTeams"),
    ("can_configure_releases", "canConfigureReleases"),
    ("can_configure_log_management", "canConfigureLogManagement"),
    ("can_create_public_custom_dashboards", "canCreatePublicCustomDashboards"),
    ("can_view_logs", "canViewLogs"),
    ("can_view_trace_details", "canViewTraceDetails"),
    ("can_configure_session_settings", "canConfigureSessionSettings"),
    ("can_configure_global_alert_payload", "canConfigureGlobalAlertPayload"),
    ("can_configure_global_application_smart_alerts", "canConfigureGlobalApplicationSmartAlerts"),
    ("can_configure_global_synthetic_smart_alerts", "canConfigureGlobalSyntheticSmartAlerts"),
    ("can_configure_global_infra_smart_alerts", "canConfigureGlobalInfraSmartAlerts"),
    ("can_configure_global_log_smart_alerts", "canConfigureGlobalLogSmartAlerts"),
    ("can_view_account_and_billing_information", "canViewAccountAndBillingInformation"),
    ("can_edit_all_accessible_custom_dashboards", "canEditAllAccessibleCustomDashboards"),
    ("can_configure_personal_api_tokens", "canConfigurePersonalApiTokens"),
    ("can_configure_database_management", "canConfigureDatabaseManagement"),
    ("can_configure_automation_actions", "canConfigureAutomationActions"),
    ("can_configure_automation_policies", "canConfigureAutomationPolicies"),
    ("can_run_automation_actions", "canRunAutomationActions"),
    ("can_delete_automation_action_history", "canDeleteAutomationActionHistory"),
    ("can_configure_synthetic_tests", "canConfigureSyntheticTests"),
    ("can_configure_synthetic_locations", "canConfigureSyntheticLocations"),
    ("can_configure_synthetic_credentials", "canConfigureSyntheticCredentials"),
    ("can_view_synthetic_tests", "canViewSyntheticTests"),
    ("can_view_synthetic_locations", "canViewSyntheticLocations"),
    ("can_view_synthetic_test_results", "canViewSyntheticTestResults"),
    ("can_use_synthetic_credentials", "canUseSyntheticCredentials"),
    ("can_configure_bizops", "canConfigureBizops"),
    ("can_view_business_processes", "canViewBusinessProcesses"),
    ("can_view_business_process_details", "canViewBusinessProcessDetails"),
    ("can_view_business_activities", "canViewBusinessActivities"),
    ("can_view_biz_alerts", "canViewBizAlerts"),
    ("can_delete_logs", "canDeleteLogs"),
    ("can_create_heap_dump", "canCreateHeapDump"),
    ("can_create_thread_dump", "canCreateThreadDump"),
    ("can_manually_close_issue", "canManuallyCloseIssue"),
    ("can_view_log_volume", "canViewLogVolume"),
    ("can_configure_log_retention_period", "canConfigureLogRetentionPeriod"),
    ("can_configure_subtraces", "canConfigureSubtraces"),
    ("can_invoke_alert_channel", "canInvokeAlertChannel"),
    ("can_configure_llm", "canConfigureLLM"),
    ("can_configure_ai_agents", "canConfigureAiAgents"),
    ("can_configure_apdex", "canConfigureApdex"),
    ("can_configure_service_level_correction_windows", "canConfigureServiceLevelCorrectionWindows"),
    ("can_configure_service_level_smart_alerts", "canConfigureServiceLevelSmartAlerts"),
    ("can_configure_service_levels", "canConfigureServiceLevels"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: String,
    pub access_granting_token: String,
    /// Client generated; addresses the token in item URLs
    pub internal_id: String,
    pub name: String,
    /// Permission flags keyed by wire name; other unknown fields land here too
    #[serde(flatten)]
    pub permissions: BTreeMap<String, serde_json::Value>,
}

impl ApiToken {
    pub fn permission(&self, wire_name: &str) -> bool {
        matches!(
            self.permissions.get(wire_name),
            Some(serde_json::Value::Bool(true))
        )
    }

    pub fn set_permission(&mut self, wire_name: &str, granted: bool) {
        self.permissions
            .insert(wire_name.to_string(), serde_json::Value::Bool(granted));
    }
}

impl RestObject for ApiToken {
    fn id(&self) -> &str {
        &self.id
    }

    fn id_for_resource_path(&self) -> &str {
        &self.internal_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn permissions_flatten_into_token_record() {
        let mut token = ApiToken {
            id: "id".to_string(),
            access_granting_token: "agt".to_string(),
            internal_id: "internal".to_string(),
            name: "ci".to_string(),
            permissions: BTreeMap::new(),
        };
        token.set_permission("canConfigureUsers", true);

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["canConfigureUsers"], json!(true));
        assert_eq!(json["internalId"], json!("internal"));

        let back: ApiToken = serde_json::from_value(json).unwrap();
        assert!(back.permission("canConfigureUsers"));
        assert!(!back.permission("canViewLogs"));
    }
}
