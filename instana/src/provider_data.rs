//! Provider data handed to every resource and data source

use crate::api::Client;

/// Built once by the provider's configure call and shared by all operations
#[derive(Clone)]
pub struct InstanaProviderData {
    pub client: Client,
}

impl InstanaProviderData {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}
