//! Authentication module
//!
//! Bearer credentials for the backend come from a [`TokenProvider`]:
//! nothing ([`NoToken`]), a fixed token ([`StaticToken`]), or an identity
//! provider session that refreshes itself ([`SessionTokenProvider`]).

mod provider;
mod types;

pub use provider::{
    provider_from_config, NoToken, Session, SessionTokenProvider, StaticToken, TokenProvider,
};
pub use types::{CachedToken, SessionConfig};
