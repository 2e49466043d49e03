//! HTTP client with retry and credential refresh
//!
//! Every backend call goes through [`HttpClient::fetch_with_retry`], a single
//! attempt loop with two retry triggers sharing one attempt counter:
//! - server errors (5xx) wait `retry_delay × attempt number`, then retry
//! - 401 drops the rejected credential, asks the token provider once, then
//!   retries at once
//!
//! Network failures are never retried. Non-success final statuses become
//! [`Error::HttpStatus`] carrying the backend's error message.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::TokenProvider;
use crate::error::{is_retryable_status, Error, Result};
use crate::types::Method;
use bytes::Bytes;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backend address used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Retries beyond the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for linear backoff
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

const GENERIC_FAILURE: &str = "Request failed";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Base delay for linear backoff
    pub retry_delay: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("pincart-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the base backoff delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Override max retries for this request
    pub max_retries: Option<u32>,
    /// Never retry server errors (the operation is not safe to repeat)
    pub non_idempotent: bool,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set max retries
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Mark the request as unsafe to repeat after a server error
    #[must_use]
    pub fn non_idempotent(mut self) -> Self {
        self.non_idempotent = true;
        self
    }
}

/// Binary response body with the headers needed to save it
#[derive(Debug, Clone)]
pub struct BinaryBody {
    /// Raw payload
    pub bytes: Bytes,
    /// `Content-Type` header, if sent
    pub content_type: Option<String>,
    /// `Content-Disposition` header, if sent
    pub content_disposition: Option<String>,
}

/// HTTP client with bounded retry and credential refresh
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    token_provider: Option<Arc<dyn TokenProvider>>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            token_provider: None,
            rate_limiter,
        })
    }

    /// Attach a credential provider; its token goes out with each request
    #[must_use]
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Issue a request, retrying on 5xx and refreshing credentials on 401.
    ///
    /// The provider's current credential, if any, goes out with the first
    /// attempt. A 401 invalidates it and asks the provider once more; the
    /// request is repeated only when that yields a different credential.
    ///
    /// The final response is returned whatever its status; only a network
    /// failure produces an error here.
    pub async fn fetch_with_retry(
        &self,
        method: Method,
        path: &str,
        config: &RequestConfig,
    ) -> Result<Response> {
        let full_url = self.build_url(path);
        let max_retries = config.max_retries.unwrap_or(self.config.max_retries);

        let mut bearer = self.current_token().await;
        let mut refreshed = false;
        let mut attempt = 0;

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let req = self.build_request(method, &full_url, config, bearer.as_deref());
            let response = req.send().await?;
            let status = response.status();

            let may_retry = attempt < max_retries;

            if is_retryable_status(status.as_u16()) && may_retry && !config.non_idempotent {
                let delay = self.calculate_backoff(attempt);
                warn!(
                    "Request failed with {}, attempt {}/{}, retrying in {:?}",
                    status.as_u16(),
                    attempt + 1,
                    max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED && may_retry && !refreshed {
                refreshed = true;

                if let Some(token) = self.replacement_token(bearer.as_deref()).await {
                    debug!(
                        "Unauthorized, retrying with refreshed credential (attempt {}/{})",
                        attempt + 2,
                        max_retries + 1
                    );
                    bearer = Some(token);
                    attempt += 1;
                    continue;
                }

                debug!("Unauthorized and no new credential available: {} {}", method, full_url);
            }

            debug!("{} {} -> {}", method, full_url, status.as_u16());
            return Ok(response);
        }
    }

    /// Make a request and fail on non-success statuses
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        config: &RequestConfig,
    ) -> Result<Response> {
        let response = self.fetch_with_retry(method, path, config).await?;
        ensure_success(response, GENERIC_FAILURE).await
    }

    /// Make a request and parse JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        config: &RequestConfig,
    ) -> Result<T> {
        let response = self.request(method, path, config).await?;
        response
            .json()
            .await
            .map_err(|e| Error::decode(format!("invalid JSON from {path}: {e}")))
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(Method::GET, path, &RequestConfig::default())
            .await
    }

    /// Make a GET request with config and parse JSON response
    pub async fn get_json_with_config<T: DeserializeOwned>(
        &self,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.request_json(Method::GET, path, &config).await
    }

    /// Submit a JSON body and parse the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let config = RequestConfig::new().json(serde_json::to_value(body)?);
        self.request_json(Method::POST, path, &config).await
    }

    /// Submit with config (body included) and parse the JSON response
    pub async fn post_json_with_config<T: DeserializeOwned>(
        &self,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.request_json(Method::POST, path, &config).await
    }

    /// Submit a JSON body and receive a binary payload (file downloads)
    pub async fn post_bytes<B>(&self, path: &str, body: &B) -> Result<BinaryBody>
    where
        B: Serialize + ?Sized,
    {
        let config = RequestConfig::new().json(serde_json::to_value(body)?);
        self.post_bytes_with_config(path, config, GENERIC_FAILURE)
            .await
    }

    /// Binary variant with config and a caller-chosen generic failure message
    pub async fn post_bytes_with_config(
        &self,
        path: &str,
        config: RequestConfig,
        failure_message: &str,
    ) -> Result<BinaryBody> {
        let response = self.fetch_with_retry(Method::POST, path, &config).await?;
        let response = ensure_success(response, failure_message).await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);
        let bytes = response.bytes().await?;

        Ok(BinaryBody {
            bytes,
            content_type,
            content_disposition,
        })
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Check if a credential provider is attached
    pub fn has_token_provider(&self) -> bool {
        self.token_provider.is_some()
    }

    /// Calculate the linear backoff delay after a failed attempt (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        self.config
            .retry_delay
            .checked_mul(attempt.saturating_add(1))
            .unwrap_or(Duration::MAX)
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        config: &RequestConfig,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method.into(), url);

        let headers = self.config.default_headers.iter().chain(&config.headers);
        for (key, value) in headers {
            // A refreshed credential replaces any configured Authorization
            if bearer.is_some() && key.eq_ignore_ascii_case("authorization") {
                continue;
            }
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        if let Some(ref body) = config.body {
            req = req.json(body);
        }

        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        req
    }

    /// Credential for a first attempt; provider failures count as none
    async fn current_token(&self) -> Option<String> {
        let provider = self.token_provider.as_ref()?;
        match provider.token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not obtain credential: {e}");
                None
            }
        }
    }

    /// Credential to retry a 401 with.
    ///
    /// The rejected bearer is dropped from the provider first, so a session
    /// provider renews instead of handing it out again.
    async fn replacement_token(&self, rejected: Option<&str>) -> Option<String> {
        if let (Some(provider), Some(rejected)) = (&self.token_provider, rejected) {
            provider.invalidate(rejected).await;
        }

        let token = self.current_token().await?;
        if rejected == Some(token.as_str()) {
            debug!("Provider returned the rejected credential again");
            return None;
        }
        Some(token)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_token_provider", &self.token_provider.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Turn a non-success response into [`Error::HttpStatus`]
async fn ensure_success(response: Response, failure_message: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .or_else(|| status.canonical_reason().map(String::from))
        .unwrap_or_else(|| failure_message.to_string());

    Err(Error::http_status(status.as_u16(), message))
}

/// Pull the error message out of a JSON error body.
///
/// Looks at `detail`, then `error`, then `message`. A list of validation
/// entries is joined by their `msg` fields.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    ["detail", "error", "message"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(message_from_value)
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Object(map) => map.get("message").and_then(message_from_value),
        _ => None,
    }
}
