//! HTTP client module
//!
//! Provides the resilient request client every backend call goes through.
//!
//! # Features
//!
//! - **Automatic Retries**: bounded retries on server errors with linear backoff
//! - **Credential Refresh**: one refresh-and-retry on 401 via a token provider
//! - **Rate Limiting**: optional token bucket throttle using governor
//! - **Error Messages**: backend error bodies reduced to a single string

mod client;
mod rate_limit;

pub use client::{
    extract_error_message, BinaryBody, HttpClient, HttpClientConfig, HttpClientConfigBuilder,
    RequestConfig, DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
