use thiserror::Error;

/// Message surfaced for every 404 from the Instana API
pub const NOT_FOUND_MESSAGE: &str = "failed to get resource from Instana API. 404 - Resource not found";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", NOT_FOUND_MESSAGE)]
    NotFound,

    #[error("failed to send HTTP {method} request to Instana API; status code = {status}; body: {body}")]
    Status {
        method: String,
        status: u16,
        body: String,
    },

    #[error("failed to send HTTP request to Instana API: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to process Instana API payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API request timed out after {0} seconds")]
    Timeout(u64),

    #[error("API request cancelled")]
    Cancelled,

    #[error("update is not supported for {0}")]
    UpdateNotSupported(String),

    #[error("invalid Instana endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// Client errors other than 404 are validation failures reported by the Platform
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if (400..500).contains(status))
    }

    /// Connection level failures are the only errors worth retrying
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            ApiError::Request(e) => e.is_connect() || (e.is_request() && !e.is_timeout()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_is_stable() {
        assert_eq!(
            ApiError::NotFound.to_string(),
            "failed to get resource from Instana API. 404 - Resource not found"
        );
    }

    #[test]
    fn status_errors_classify_by_code() {
        let conflict = ApiError::Status {
            method: "PUT".to_string(),
            status: 409,
            body: "conflict".to_string(),
        };
        assert!(conflict.is_validation());
        assert!(conflict.to_string().contains("status code = 409"));

        let server = ApiError::Status {
            method: "GET".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(!server.is_validation());
        assert!(!server.is_retryable());
    }
}
