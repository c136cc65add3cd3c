use serde::{Deserialize, Serialize};

use super::application_config::AccessRule;
use crate::api::RestObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDashboard {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub access_rules: Vec<AccessRule>,
    /// Widget definitions are opaque to the provider
    #[serde(default)]
    pub widgets: serde_json::Value,
}

impl RestObject for CustomDashboard {
    fn id(&self) -> &str {
        &self.id
    }
}
