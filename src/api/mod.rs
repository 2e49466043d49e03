//! PinCart backend API
//!
//! Typed wrappers for each backend endpoint. Everything goes through the
//! resilient [`HttpClient`](crate::http::HttpClient), so all calls share its
//! retry and credential refresh behavior.
//!
//! | call | endpoint |
//! |---|---|
//! | [`PinCartApi::discover`] | `GET /discover?keyword=` |
//! | [`PinCartApi::match_product`] | `POST /match-product` |
//! | [`PinCartApi::generate`] | `POST /generate` |
//! | [`PinCartApi::export`] | `POST /export` (CSV download) |
//! | [`PinCartApi::create_checkout`] | `POST /create-checkout` |
//! | [`PinCartApi::create_portal`] | `POST /create-portal` |

mod client;
mod types;

pub use client::{default_export_filename, filename_from_disposition, PinCartApi, MAX_KEYWORD_LEN};
pub use types::{
    CheckoutRequest, CheckoutSession, DiscoverResponse, ExportFile, ExportRequest, FaqItem,
    GenerateRequest, GenerateResponse, GeneratedCopy, GeneratedPage, MatchRequest, MatchResponse,
    PageSupplier, Plan, PortalSession, Product, Supplier, Tone, DEFAULT_PRICE, DEFAULT_VENDOR,
};
