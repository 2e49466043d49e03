//! Client configuration
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables. CLI flags are applied last by the runner.
//!
//! ```yaml
//! base_url: https://api.pincart.ai
//! max_retries: 2
//! retry_delay_ms: 1000
//! auth:
//!   url: https://project.supabase.co/auth/v1
//!   anon_key: public-anon-key
//!   refresh_token: ...
//! rate_limit:
//!   requests_per_minute: 30
//!   burst_size: 5
//! error_reporting:
//!   dsn: https://key@errors.example.com/1
//! ```

use crate::api::PinCartApi;
use crate::auth::{provider_from_config, SessionConfig};
use crate::error::{Error, Result};
use crate::http::{
    HttpClient, HttpClientConfig, RateLimiterConfig, DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES,
};
use crate::telemetry::ReportingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Backend base URL
pub const ENV_API_URL: &str = "PINCART_API_URL";
/// Session access token
pub const ENV_ACCESS_TOKEN: &str = "PINCART_ACCESS_TOKEN";
/// Session refresh token
pub const ENV_REFRESH_TOKEN: &str = "PINCART_REFRESH_TOKEN";
/// Identity provider auth base URL
pub const ENV_AUTH_URL: &str = "PINCART_AUTH_URL";
/// Identity provider public key
pub const ENV_AUTH_ANON_KEY: &str = "PINCART_AUTH_ANON_KEY";
/// Sentry DSN for error reporting
pub const ENV_ERROR_DSN: &str = "PINCART_ERROR_DSN";

// ============================================================================
// Settings
// ============================================================================

/// Complete client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Backend base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries beyond the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for linear backoff, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Identity provider session
    #[serde(default)]
    pub auth: SessionConfig,

    /// Client-side throttle
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Error reporting
    #[serde(default)]
    pub error_reporting: ReportingConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: None,
            auth: SessionConfig::default(),
            rate_limit: None,
            error_reporting: ReportingConfig::default(),
        }
    }
}

impl ClientSettings {
    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Defaults, then the optional file, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay values from an environment lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.base_url = url;
        }
        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.auth.access_token = Some(token);
        }
        if let Some(token) = get(ENV_REFRESH_TOKEN) {
            self.auth.refresh_token = Some(token);
        }
        if let Some(url) = get(ENV_AUTH_URL) {
            self.auth.url = Some(url);
        }
        if let Some(key) = get(ENV_AUTH_ANON_KEY) {
            self.auth.anon_key = Some(key);
        }
        if let Some(dsn) = get(ENV_ERROR_DSN) {
            self.error_reporting.dsn = Some(dsn);
        }
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", format!("{}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than 0"));
        }

        if let Some(auth_url) = &self.auth.url {
            Url::parse(auth_url)
                .map_err(|e| Error::invalid_value("auth.url", format!("{auth_url}: {e}")))?;
        }

        self.error_reporting.parsed_dsn()?;

        Ok(())
    }

    /// HTTP client configuration for these settings
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.base_url.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .retry_delay(Duration::from_millis(self.retry_delay_ms));

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        if let Some(limit) = &self.rate_limit {
            builder = builder.rate_limit(limit.clone());
        }

        builder.build()
    }

    /// Build the request client, with a credential provider when configured
    pub fn build_client(&self) -> Result<HttpClient> {
        let client = HttpClient::with_config(self.http_config())?;
        Ok(match provider_from_config(&self.auth) {
            Some(provider) => client.with_token_provider(provider),
            None => client,
        })
    }

    /// Build the backend API client
    pub fn build_api(&self) -> Result<PinCartApi> {
        Ok(PinCartApi::new(self.build_client()?))
    }
}
