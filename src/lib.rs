// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # PinCart client
//!
//! A resilient client for the PinCart backend: trending product discovery,
//! supplier matching, AI product page copy, store-import CSV export and
//! subscription billing.
//!
//! ## Features
//!
//! - **Retry with linear backoff**: server errors are retried `max_retries` times
//! - **Credential refresh**: a 401 drops the rejected session token, renews it and retries once
//! - **Readable errors**: backend `detail`/`error`/`message` bodies become the error text
//! - **Binary downloads**: CSV exports keep the server-chosen filename
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pincart_client::{ClientSettings, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let api = ClientSettings::load(None)?.build_api()?;
//!
//!     let found = api.discover("home decor").await?;
//!     if let Some(product) = found.top_product() {
//!         println!("{} ({})", product.title, product.demand_score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          PinCartApi                          │
//! │  discover  match_product  generate  export  checkout  portal │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────┬───────────┴──────────┬─────────────────────┐
//! │      HTTP       │         Auth         │       Errors        │
//! ├─────────────────┼──────────────────────┼─────────────────────┤
//! │ Retry (5xx)     │ TokenProvider        │ detail/error/message│
//! │ Linear backoff  │ Session refresh      │ Status text         │
//! │ Rate limit      │ Static / none        │ Reporting hook      │
//! └─────────────────┴──────────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credential providers
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Typed backend endpoints
pub mod api;

/// Layered client settings
pub mod config;

/// Logging and error reporting
pub mod telemetry;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use api::PinCartApi;
pub use config::ClientSettings;
pub use http::{HttpClient, HttpClientConfig, RequestConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
