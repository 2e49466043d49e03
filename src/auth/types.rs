//! Auth configuration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity provider session settings
///
/// `url` is the identity provider's auth base (e.g.
/// `https://<project>.supabase.co/auth/v1`); `anon_key` is sent as the
/// `apikey` header on sign-in and refresh calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Auth base URL of the identity provider
    #[serde(default)]
    pub url: Option<String>,
    /// Public API key of the identity provider project
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Access token from a previous login
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token from a previous login
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SessionConfig {
    /// Whether a refresh can be attempted with these settings
    pub fn can_refresh(&self) -> bool {
        self.url.is_some() && self.refresh_token.is_some()
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }
}
