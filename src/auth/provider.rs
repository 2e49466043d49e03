//! Credential providers
//!
//! The request client attaches a [`TokenProvider`]'s credential to each
//! request and, when the backend answers 401, invalidates it and asks again.
//! Providers are injected at construction; a client without one simply
//! surfaces the 401.

use super::types::{CachedToken, SessionConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Source of bearer credentials
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get the current credential, refreshing it first if it has expired.
    ///
    /// `Ok(None)` means no credential can be obtained.
    async fn token(&self) -> Result<Option<String>>;

    /// Forget a credential the backend has rejected
    async fn invalidate(&self, _token: &str) {}
}

/// Provider that never yields a credential
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Provider returning a fixed token
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Provider that always hands out `token`
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}

#[derive(Debug, Default)]
struct SessionState {
    access: Option<CachedToken>,
    refresh_token: Option<String>,
}

/// Identity provider session with refresh-token support
pub struct SessionTokenProvider {
    config: SessionConfig,
    state: Arc<RwLock<SessionState>>,
    http_client: Client,
}

impl SessionTokenProvider {
    /// Create a provider from session settings
    pub fn new(config: SessionConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a provider with a custom HTTP client
    pub fn with_client(config: SessionConfig, http_client: Client) -> Self {
        let state = SessionState {
            access: config
                .access_token
                .clone()
                .map(|t| CachedToken::new(t, None)),
            refresh_token: config.refresh_token.clone(),
        };

        Self {
            config,
            state: Arc::new(RwLock::new(state)),
            http_client,
        }
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<Option<String>> {
        {
            let state = self.state.read().await;
            if let Some(token) = state.access.as_ref() {
                if !token.is_expired() {
                    return Ok(Some(token.token.clone()));
                }
            }
        }

        let mut state = self.state.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(token) = state.access.as_ref() {
            if !token.is_expired() {
                return Ok(Some(token.token.clone()));
            }
        }

        let Some(refresh_token) = state.refresh_token.clone() else {
            debug!("No refresh token available, session cannot be renewed");
            state.access = None;
            return Ok(None);
        };

        let refreshed = self.fetch_refreshed_session(&refresh_token).await?;
        let token_str = refreshed.access_token.clone();
        if let Some(rotated) = refreshed.refresh_token.clone() {
            state.refresh_token = Some(rotated);
        }
        state.access = Some(refreshed.cached_token());

        Ok(Some(token_str))
    }

    /// Exchange a refresh token for a new session
    async fn fetch_refreshed_session(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .token_request("refresh_token", &json!({ "refresh_token": refresh_token }))
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::token_refresh(format!(
                "Refresh token request failed with status {status}: {body}"
            )));
        }

        let session: Session = response.json().await.map_err(Error::Http)?;
        debug!("Session refreshed");
        Ok(session)
    }

    /// Sign in with email and password.
    ///
    /// The new session replaces whatever this provider held, so later
    /// [`TokenProvider::token`] calls hand out its access token.
    pub async fn password_login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .token_request("password", &json!({ "email": email, "password": password }))
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = auth_error_message(&body)
                .or_else(|| status.canonical_reason().map(String::from))
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(Error::auth(message));
        }

        let session: Session = response.json().await.map_err(Error::Http)?;

        let mut state = self.state.write().await;
        if let Some(refresh) = &session.refresh_token {
            state.refresh_token = Some(refresh.clone());
        }
        state.access = Some(session.cached_token());
        debug!("Signed in as {email}");

        Ok(session)
    }

    /// `POST {auth_url}/token?grant_type=...` with the project key
    async fn token_request(&self, grant_type: &str, body: &serde_json::Value) -> Result<Response> {
        let base = self
            .config
            .url
            .as_deref()
            .ok_or_else(|| Error::missing_field("auth.url"))?;
        let url = format!("{}/token", base.trim_end_matches('/'));

        let mut req = self
            .http_client
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .json(body);

        if let Some(key) = &self.config.anon_key {
            req = req.header("apikey", key.as_str());
        }

        req.send().await.map_err(Error::Http)
    }
}

#[async_trait]
impl TokenProvider for SessionTokenProvider {
    async fn token(&self) -> Result<Option<String>> {
        self.get_or_refresh_token().await
    }

    async fn invalidate(&self, token: &str) {
        let mut state = self.state.write().await;
        if state.access.as_ref().is_some_and(|t| t.token == token) {
            warn!("Discarding rejected session token");
            state.access = None;
        }
    }
}

impl std::fmt::Debug for SessionTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenProvider")
            .field("url", &self.config.url)
            .field("can_refresh", &self.config.can_refresh())
            .finish_non_exhaustive()
    }
}

/// Build the provider matching the configured session, if any
pub fn provider_from_config(config: &SessionConfig) -> Option<Arc<dyn TokenProvider>> {
    if config.can_refresh() {
        Some(Arc::new(SessionTokenProvider::new(config.clone())))
    } else {
        config
            .access_token
            .as_ref()
            .map(|t| Arc::new(StaticToken::new(t.clone())) as Arc<dyn TokenProvider>)
    }
}

/// Session issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl Session {
    fn cached_token(&self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token.clone(), secs),
            None => CachedToken::new(self.access_token.clone(), None),
        }
    }
}

/// Error text of an identity provider response
fn auth_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(String::from)
}
