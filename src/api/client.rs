//! Typed calls to the PinCart backend

use super::types::{
    CheckoutRequest, CheckoutSession, DiscoverResponse, ExportFile, ExportRequest,
    GenerateRequest, GenerateResponse, MatchRequest, MatchResponse, Plan, PortalSession,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use futures::future::join_all;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Longest keyword the backend accepts
pub const MAX_KEYWORD_LEN: usize = 80;

const EXPORT_FAILED: &str = "Export failed";

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#).unwrap()
});

/// Client for the discovery, matching, generation, export and billing API
#[derive(Debug)]
pub struct PinCartApi {
    http: HttpClient,
}

impl PinCartApi {
    /// Wrap a configured request client
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// The underlying request client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Find trending products for a keyword
    pub async fn discover(&self, keyword: &str) -> Result<DiscoverResponse> {
        let keyword = validate_keyword(keyword)?;
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("keyword", keyword)
            .finish();

        let response: DiscoverResponse = self.http.get_json(&format!("/discover?{query}")).await?;
        debug!("Discovered {} products for '{}'", response.products.len(), keyword);
        Ok(response)
    }

    /// Discover several keywords concurrently.
    ///
    /// Results come back in input order; one keyword failing does not affect
    /// the others.
    pub async fn discover_many<S: AsRef<str>>(
        &self,
        keywords: &[S],
    ) -> Vec<(String, Result<DiscoverResponse>)> {
        let calls = keywords.iter().map(|k| async move {
            let keyword = k.as_ref().to_string();
            let result = self.discover(&keyword).await;
            (keyword, result)
        });
        join_all(calls).await
    }

    /// Find supplier candidates for a product
    pub async fn match_product(&self, request: &MatchRequest) -> Result<MatchResponse> {
        require("Product title", &request.product_title)?;
        self.http.post_json("/match-product", request).await
    }

    /// Generate product page copy
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        require("Product name", &request.product_name)?;
        info!("Generating copy for '{}'", request.product_name);
        self.http.post_json("/generate", request).await
    }

    /// Export a product as a store-import CSV
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportFile> {
        require("Product name", &request.product_name)?;

        let config = RequestConfig::new().json(serde_json::to_value(request)?);
        let body = self
            .http
            .post_bytes_with_config("/export", config, EXPORT_FAILED)
            .await?;

        let filename = body
            .content_disposition
            .as_deref()
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| default_export_filename(&request.product_name));

        Ok(ExportFile {
            filename,
            content_type: body.content_type,
            bytes: body.bytes,
        })
    }

    /// Start a subscription checkout; returns the payment page URL.
    ///
    /// Never retried on server errors: a repeat could open a second session.
    pub async fn create_checkout(
        &self,
        user_id: &str,
        email: &str,
        plan: Plan,
    ) -> Result<CheckoutSession> {
        require("User id", user_id)?;
        let request = CheckoutRequest::checkout(user_id, email, plan);
        let config = RequestConfig::new()
            .json(serde_json::to_value(&request)?)
            .non_idempotent();
        self.http
            .post_json_with_config("/create-checkout", config)
            .await
    }

    /// Open the billing portal for an existing subscriber
    pub async fn create_portal(&self, user_id: &str, email: &str) -> Result<PortalSession> {
        require("User id", user_id)?;
        let request = CheckoutRequest::portal(user_id, email);
        let config = RequestConfig::new()
            .json(serde_json::to_value(&request)?)
            .non_idempotent();
        self.http.post_json_with_config("/create-portal", config).await
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_keyword(keyword: &str) -> Result<&str> {
    let keyword = keyword.trim();
    require("Keyword", keyword)?;
    if keyword.chars().count() > MAX_KEYWORD_LEN {
        return Err(Error::validation(format!(
            "Keyword must be at most {MAX_KEYWORD_LEN} characters"
        )));
    }
    Ok(keyword)
}

/// Filename from a `Content-Disposition` header, without any directory part
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = FILENAME_RE.captures(header)?.get(1)?.as_str().trim();
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

/// `pincart-<slug>.csv`, slug being at most 40 chars of `[a-z0-9-]`
pub fn default_export_filename(product_name: &str) -> String {
    let slug: String = product_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .take(40)
        .collect();
    format!("pincart-{slug}.csv")
}
