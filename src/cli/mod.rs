//! CLI module
//!
//! Command-line interface to the PinCart backend.
//!
//! # Commands
//!
//! - `login` - Sign in and optionally save the session
//! - `discover` - Find trending products for keywords
//! - `match` - Find suppliers for a product
//! - `generate` - Generate product page copy
//! - `export` - Download a store-import CSV for a generated page
//! - `checkout` / `portal` - Billing sessions
//! - `run` - The whole flow for one keyword

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{export_path, Runner};
