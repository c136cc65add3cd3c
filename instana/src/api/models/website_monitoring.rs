use serde::{Deserialize, Serialize};

use crate::api::RestObject;

/// Website monitoring configuration; the name travels as a query parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteMonitoringConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub app_name: String,
}

impl RestObject for WebsiteMonitoringConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn query_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}
