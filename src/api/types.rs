//! Request and response payloads of the PinCart backend

use serde::{Deserialize, Serialize};

/// Retail price used when no supplier estimate is available
pub const DEFAULT_PRICE: f64 = 29.99;

/// Vendor name used when none is given
pub const DEFAULT_VENDOR: &str = "My Store";

// ============================================================================
// Discovery
// ============================================================================

/// A trending product found on Pinterest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub pin_url: String,
    /// 0–100, higher means more demand
    #[serde(default)]
    pub demand_score: u32,
    #[serde(default)]
    pub saves_text: String,
}

/// Result of `GET /discover`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl DiscoverResponse {
    /// Product with the highest demand score
    pub fn top_product(&self) -> Option<&Product> {
        self.products.iter().max_by_key(|p| p.demand_score)
    }
}

// ============================================================================
// Supplier matching
// ============================================================================

/// Body of `POST /match-product`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub product_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MatchRequest {
    pub fn new(product_title: impl Into<String>) -> Self {
        Self {
            product_title: product_title.into(),
            image_url: None,
        }
    }

    /// Match request for a discovered product
    pub fn for_product(product: &Product) -> Self {
        Self {
            product_title: product.title.clone(),
            image_url: (!product.image.is_empty()).then(|| product.image.clone()),
        }
    }
}

/// A wholesale supplier candidate with cost and margin estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub source: String,
    pub supplier_name: String,
    #[serde(default)]
    pub product_title: String,
    pub unit_cost: f64,
    pub suggested_retail: f64,
    #[serde(default)]
    pub estimated_margin_pct: f64,
    #[serde(default)]
    pub shipping_regions: Vec<String>,
    #[serde(default)]
    pub product_url: String,
    #[serde(default)]
    pub image: String,
}

/// Result of `POST /match-product`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    pub product_title: String,
    #[serde(default)]
    pub match_count: usize,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub disclaimer: String,
}

impl MatchResponse {
    /// Supplier with the lowest unit cost
    pub fn cheapest(&self) -> Option<&Supplier> {
        self.suppliers
            .iter()
            .min_by(|a, b| a.unit_cost.total_cmp(&b.unit_cost))
    }
}

// ============================================================================
// Copy generation
// ============================================================================

/// Writing style of generated copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Standard,
    Playful,
    Luxury,
    Urgency,
}

/// Body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub product_name: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl GenerateRequest {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            target_audience: String::new(),
            tone: Tone::default(),
            supplier_price: None,
            user_id: None,
        }
    }

    #[must_use]
    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    #[must_use]
    pub fn supplier_price(mut self, price: f64) -> Self {
        self.supplier_price = Some(price);
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// One question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub a: String,
}

/// AI-written product page copy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCopy {
    #[serde(default)]
    pub seo_title: String,
    /// HTML formatted
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub faq: Vec<FaqItem>,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok_hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinterest_caption: Option<String>,
}

/// Result of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub product_name: String,
    pub generated: GeneratedCopy,
}

/// A generation result together with the supplier it was priced from.
///
/// This is what `pincart generate` saves and `pincart export` reads back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPage {
    pub product_name: String,
    pub generated: GeneratedCopy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<PageSupplier>,
}

/// Pricing carried from the chosen supplier into the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSupplier {
    pub unit_cost: f64,
    pub suggested_retail: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl GeneratedPage {
    /// Combine a generation with the supplier and product image it used
    pub fn new(
        response: GenerateResponse,
        supplier: Option<&Supplier>,
        image: Option<&str>,
    ) -> Self {
        Self {
            product_name: response.product_name,
            generated: response.generated,
            supplier: supplier.map(|s| PageSupplier {
                unit_cost: s.unit_cost,
                suggested_retail: s.suggested_retail,
                image: image.filter(|i| !i.is_empty()).map(String::from),
            }),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

/// Body of `POST /export`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub product_name: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub faq: Vec<FaqItem>,
    #[serde(default = "default_price")]
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub seo_title: String,
    #[serde(default)]
    pub seo_description: String,
}

fn default_price() -> f64 {
    DEFAULT_PRICE
}

fn default_vendor() -> String {
    DEFAULT_VENDOR.to_string()
}

impl ExportRequest {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            description_html: String::new(),
            bullets: Vec::new(),
            faq: Vec::new(),
            price: DEFAULT_PRICE,
            image_url: String::new(),
            vendor: default_vendor(),
            tags: String::new(),
            seo_title: String::new(),
            seo_description: String::new(),
        }
    }

    /// Build the export for a generated page.
    ///
    /// The listing title is the SEO title when there is one; the price is the
    /// supplier's suggested retail, else [`DEFAULT_PRICE`].
    pub fn from_page(page: &GeneratedPage) -> Self {
        let copy = &page.generated;
        let title = if copy.seo_title.is_empty() {
            page.product_name.clone()
        } else {
            copy.seo_title.clone()
        };
        let supplier = page.supplier.as_ref();

        Self {
            product_name: title,
            description_html: copy.description.clone(),
            bullets: copy.bullets.clone(),
            faq: copy.faq.clone(),
            price: supplier
                .map(|s| s.suggested_retail)
                .filter(|p| *p > 0.0)
                .unwrap_or(DEFAULT_PRICE),
            image_url: supplier
                .and_then(|s| s.image.clone())
                .unwrap_or_default(),
            vendor: default_vendor(),
            tags: String::new(),
            seo_title: copy.seo_title.clone(),
            seo_description: copy.meta_description.clone(),
        }
    }
}

/// A downloaded store-import file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}

// ============================================================================
// Billing
// ============================================================================

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Starter,
    Pro,
}

/// Body of `POST /create-checkout` and `POST /create-portal`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub email: String,
    /// Empty for portal sessions
    pub plan: String,
}

impl CheckoutRequest {
    pub fn checkout(user_id: impl Into<String>, email: impl Into<String>, plan: Plan) -> Self {
        let plan = match plan {
            Plan::Starter => "starter",
            Plan::Pro => "pro",
        };
        Self {
            user_id: user_id.into(),
            email: email.into(),
            plan: plan.to_string(),
        }
    }

    pub fn portal(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            plan: String::new(),
        }
    }
}

/// Result of `POST /create-checkout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

/// Result of `POST /create-portal`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSession {
    pub portal_url: String,
}
