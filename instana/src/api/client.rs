use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tfplug::Context;

use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, WriteThrottle};

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Instana REST API client
///
/// Cheap to clone; every clone shares the connection pool and the write
/// throttle.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
    throttle: WriteThrottle,
}

#[derive(Clone)]
pub struct RetryConfig {
    /// Attempts for idempotent reads, including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
    /// Write requests started per second
    pub writes_per_second: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
            writes_per_second: 5,
        }
    }
}

/// Prefix bare `host[:port]` endpoints with https and drop trailing slashes
pub fn normalize_endpoint(endpoint: &str) -> Result<String, ApiError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidEndpoint("endpoint is empty".to_string()));
    }
    let base = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    url::Url::parse(&base).map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
    Ok(base)
}

/// Item path below a collection; the separator is skipped when the
/// collection already ends with a slash. The id is percent-encoded
pub fn resource_path(collection: &str, id: &str) -> String {
    let id = urlencoding::encode(id);
    if collection.ends_with('/') {
        format!("{}{}", collection, id)
    } else {
        format!("{}/{}", collection, id)
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, api_token: &str, tls_skip_verify: bool) -> Result<Self, ApiError> {
        Self::with_config(endpoint, api_token, tls_skip_verify, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        api_token: &str,
        tls_skip_verify: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };
        let http_client = pool_config.build_client(tls_skip_verify)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: normalize_endpoint(endpoint)?,
                auth_header: format!("apiToken {}", api_token),
                throttle: WriteThrottle::per_second(retry_config.writes_per_second),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request, retrying connection failures
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let text = self.execute(ctx, Method::GET, path, query, None).await?;
        decode(&text)
    }

    /// Execute a POST request; an empty response body yields None
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        let body = serde_json::to_vec(body)?;
        let text = self.execute(ctx, Method::POST, path, query, Some(body)).await?;
        decode_optional(&text)
    }

    /// Execute a PUT request; an empty response body yields None
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        let body = serde_json::to_vec(body)?;
        let text = self.execute(ctx, Method::PUT, path, query, Some(body)).await?;
        decode_optional(&text)
    }

    pub async fn delete(&self, ctx: &Context, path: &str) -> Result<(), ApiError> {
        self.execute(ctx, Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    /// Run one request on behalf of an operation; dropping the request on
    /// cancellation aborts the HTTP call
    async fn execute(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<String, ApiError> {
        let request = async {
            if method == Method::GET {
                self.execute_with_retry(&method, path, query).await
            } else {
                self.execute_throttled(&method, path, query, body).await
            }
        };
        ctx.run(request).await.map_err(|_| {
            tracing::debug!("{} request to {} cancelled", method, path);
            ApiError::Cancelled
        })?
    }

    /// Writes wait for the throttle; the whole write is bounded by the
    /// request timeout
    async fn execute_throttled(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<String, ApiError> {
        let timeout_seconds = self.inner.retry_config.timeout_seconds;
        let write = async {
            self.inner.throttle.acquire().await;
            self.send_once(method, path, query, body).await
        };
        tokio::time::timeout(Duration::from_secs(timeout_seconds), write)
            .await
            .map_err(|_| ApiError::Timeout(timeout_seconds))?
    }

    /// Execute request with retry logic
    async fn execute_with_retry(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<String, ApiError> {
        let config = &self.inner.retry_config;
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    config.initial_backoff_ms * 2_u64.pow(attempt - 1),
                    config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match self.send_once(method, path, query, None).await {
                Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                    tracing::warn!("Request to {} failed: {}", path, e);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let mut request = self
            .inner
            .http_client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, &self.inner.auth_header);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            tracing::debug!("Request body: {}", String::from_utf8_lossy(&body));
            request = request.header(CONTENT_TYPE, JSON_UTF8).body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("{} request to {} failed: {}", method, url, e);
            ApiError::Request(e)
        })?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("Response status: {}, body: {}", status, text);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            tracing::error!("API error response ({}): {}", status, text);
            return Err(ApiError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::Serialization(e)
    })
}

fn decode_optional<T: DeserializeOwned>(text: &str) -> Result<Option<T>, ApiError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    decode(text).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    fn client_for(server: &Server) -> Client {
        Client::new(&server.url(), "secret", false).unwrap()
    }

    #[test]
    fn endpoint_without_scheme_defaults_to_https() {
        assert_eq!(
            normalize_endpoint("tenant.instana.io").unwrap(),
            "https://tenant.instana.io"
        );
        assert_eq!(
            normalize_endpoint("http://localhost:8080/").unwrap(),
            "http://localhost:8080"
        );
        assert!(normalize_endpoint("  ").is_err());
    }

    #[test]
    fn item_paths_respect_trailing_slash() {
        assert_eq!(resource_path("/api/things", "42"), "/api/things/42");
        assert_eq!(resource_path("/api/things/", "42"), "/api/things/42");
        assert_eq!(resource_path("/api/things", "a b/c"), "/api/things/a%20b%2Fc");
    }

    #[tokio::test]
    async fn get_sends_api_token_and_decodes_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/things/1")
            .match_header("authorization", "apiToken secret")
            .match_header("accept", "application/json")
            .with_body(r#"{"id":"1"}"#)
            .create_async()
            .await;

        let item: Item = client_for(&server)
            .get(&Context::new(), "/api/things/1", &[])
            .await
            .unwrap();
        assert_eq!(item.id, "1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/things/2")
            .with_status(404)
            .create_async()
            .await;

        let result: Result<Item, _> = client_for(&server)
            .get(&Context::new(), "/api/things/2", &[])
            .await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn server_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/things")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let result: Result<Vec<Item>, _> = client_for(&server)
            .get(&Context::new(), "/api/things", &[])
            .await;
        match result {
            Err(ApiError::Status { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn query_parameters_are_encoded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/host-agent")
            .match_query(Matcher::UrlEncoded(
                "query".to_string(),
                "entity.zone:eu west".to_string(),
            ))
            .with_body("[]")
            .create_async()
            .await;

        let items: Vec<Item> = client_for(&server)
            .get(
                &Context::new(),
                "/api/host-agent",
                &[("query", "entity.zone:eu west")],
            )
            .await
            .unwrap();
        assert!(items.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn writes_send_json_content_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/things/3")
            .match_header("content-type", "application/json; charset=utf-8")
            .match_body(Matcher::Json(serde_json::json!({"id":"3"})))
            .with_body("")
            .create_async()
            .await;

        let result: Option<Item> = client_for(&server)
            .put(
                &Context::new(),
                "/api/things/3",
                &[],
                &serde_json::json!({"id":"3"}),
            )
            .await
            .unwrap();
        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let server = Server::new_async().await;
        let ctx = Context::new();
        ctx.cancel();

        let result = client_for(&server).delete(&ctx, "/api/things/4").await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn connection_failures_surface_as_request_errors() {
        let config = RetryConfig {
            initial_backoff_ms: 1,
            ..Default::default()
        };
        let client = Client::with_config("http://127.0.0.1:1", "token", false, config).unwrap();

        let result: Result<Item, _> = client.get(&Context::new(), "/api/things", &[]).await;
        assert!(matches!(result, Err(ApiError::Request(_))));
    }
}
