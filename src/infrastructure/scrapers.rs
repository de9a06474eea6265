//! Scraper capability registry and the default HTML scraper
//!
//! Per-store DOM adapters are external collaborators; the core only requires
//! the [`ProductScraper`] capability: given a URL, produce a normalized
//! [`ProductSnapshot`] or fail. The registry maps the closed [`Store`] enum
//! to capabilities; [`ScraperRegistry::from_fn`] iterates [`Store::ALL`] so
//! a `match` at the construction site stays statically exhaustive.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::domain::entities::ProductSnapshot;
use crate::domain::money::to_cents;
use crate::domain::sizes::{canonical_join, order_sizes, SIZE_UNIQUE};
use crate::domain::store::Store;
use crate::infrastructure::http_client::HttpClient;

/// One store's scrape capability.
///
/// `is_initial_fetch` distinguishes a cold fetch for a brand-new URL from a
/// routine re-check, letting adapters apply different wait/retry rules.
/// `Ok(None)` means the page was fetched but carries no product data.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    async fn scrape(&self, url: &str, is_initial_fetch: bool) -> Result<Option<ProductSnapshot>>;
}

/// Maps each [`Store`] to its scrape capability.
#[derive(Default)]
pub struct ScraperRegistry {
    capabilities: HashMap<Store, Arc<dyn ProductScraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry covering every store variant from a constructor
    /// function - typically an exhaustive `match` over [`Store`].
    pub fn from_fn(capability: impl Fn(Store) -> Arc<dyn ProductScraper>) -> Self {
        let mut registry = Self::new();
        for store in Store::ALL {
            registry.register(store, capability(store));
        }
        registry
    }

    pub fn register(&mut self, store: Store, scraper: Arc<dyn ProductScraper>) {
        self.capabilities.insert(store, scraper);
    }

    pub fn resolve(&self, store: Store) -> Option<Arc<dyn ProductScraper>> {
        self.capabilities.get(&store).cloned()
    }

    /// True when every store variant has a registered capability.
    pub fn is_complete(&self) -> bool {
        Store::ALL
            .iter()
            .all(|store| self.capabilities.contains_key(store))
    }
}

/// Default capability: fetch the page over HTTP and extract the schema.org
/// `Product` JSON-LD block most storefronts embed. Stores needing headless
/// rendering or bespoke selectors plug their own [`ProductScraper`] in.
pub struct HtmlScraper {
    http: Arc<HttpClient>,
    initial_fetch_retries: u32,
}

impl HtmlScraper {
    pub fn new(http: Arc<HttpClient>, initial_fetch_retries: u32) -> Self {
        Self {
            http,
            initial_fetch_retries,
        }
    }

    async fn fetch(&self, url: &str, is_initial_fetch: bool) -> Result<String> {
        // A cold fetch gets extra attempts; a routine re-check fails fast
        // and lets the next cycle try again.
        let attempts = if is_initial_fetch {
            1 + self.initial_fetch_retries
        } else {
            1
        };

        let mut last_error = None;
        for attempt in 0..attempts {
            match self.http.get_text(url).await {
                Ok(body) => {
                    if attempt > 0 {
                        tracing::info!("Fetched {url} on attempt {}", attempt + 1);
                    }
                    return Ok(body);
                }
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no fetch attempt made for {url}")))
    }
}

#[async_trait]
impl ProductScraper for HtmlScraper {
    async fn scrape(&self, url: &str, is_initial_fetch: bool) -> Result<Option<ProductSnapshot>> {
        let body = self.fetch(url, is_initial_fetch).await?;
        extract_snapshot(&body).with_context(|| format!("Failed to extract product data from {url}"))
    }
}

/// Pulls the first schema.org `Product` object out of the page's JSON-LD
/// blocks and normalizes it into a snapshot. Synchronous on purpose: the
/// parsed DOM is not `Send` and must not live across an await point.
fn extract_snapshot(html: &str) -> Result<Option<ProductSnapshot>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script[type='application/ld+json']")
        .map_err(|error| anyhow::anyhow!("Invalid JSON-LD selector: {error:?}"))?;

    for element in document.select(&selector) {
        let raw: String = element.text().collect();
        let Ok(json) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        if let Some(product) = find_product_object(&json) {
            return Ok(Some(snapshot_from_json_ld(product)?));
        }
    }
    Ok(None)
}

/// JSON-LD may hold the product at the top level, inside an array, or under
/// an `@graph` collection.
fn find_product_object(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(object) => {
            if object.get("@type").and_then(Value::as_str) == Some("Product") {
                return Some(json);
            }
            object.get("@graph").and_then(find_product_object)
        }
        Value::Array(items) => items.iter().find_map(find_product_object),
        _ => None,
    }
}

fn snapshot_from_json_ld(product: &Value) -> Result<ProductSnapshot> {
    let name = product
        .get("name")
        .and_then(Value::as_str)
        .context("Product block has no name")?
        .trim()
        .to_string();

    let store_product_id = ["sku", "productID", "mpn"]
        .iter()
        .find_map(|key| product.get(*key).and_then(Value::as_str))
        .unwrap_or(&name)
        .to_string();

    let photo_url = match product.get("image") {
        Some(Value::String(image)) => image.clone(),
        Some(Value::Array(images)) => images
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    let offers = product.get("offers");
    let (current_price, original_price, currency) = prices_from_offers(offers);
    let (all_sizes, available_sizes) = sizes_from_offers(offers);

    Ok(ProductSnapshot {
        store_product_id,
        name,
        original_price,
        current_price,
        currency,
        all_sizes,
        available_sizes,
        photo_url,
    })
}

fn prices_from_offers(offers: Option<&Value>) -> (i64, i64, String) {
    let first_offer = match offers {
        Some(Value::Array(items)) => items.first(),
        Some(offer @ Value::Object(_)) => Some(offer),
        _ => None,
    };

    let Some(offer) = first_offer else {
        return (0, 0, "EUR".to_string());
    };

    let current = price_value(offer.get("price"))
        .or_else(|| price_value(offer.get("lowPrice")))
        .unwrap_or(0.0);
    let original = price_value(offer.get("highPrice")).unwrap_or(current);
    let currency = offer
        .get("priceCurrency")
        .and_then(Value::as_str)
        .unwrap_or("EUR")
        .to_string();

    (to_cents(current), to_cents(original), currency)
}

fn price_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Derives the size vocabulary from a multi-offer block (one offer per
/// size). A single offer means a sizeless product: the `UNIQUE` sentinel.
fn sizes_from_offers(offers: Option<&Value>) -> (String, String) {
    let Some(Value::Array(items)) = offers else {
        return (SIZE_UNIQUE.to_string(), SIZE_UNIQUE.to_string());
    };
    if items.len() < 2 {
        return (SIZE_UNIQUE.to_string(), SIZE_UNIQUE.to_string());
    }

    let mut all = Vec::new();
    let mut available = Vec::new();
    for offer in items {
        let Some(size) = offer
            .get("name")
            .or_else(|| offer.get("sku"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        let size = size.trim().to_uppercase();
        if size.is_empty() || all.contains(&size) {
            continue;
        }
        let in_stock = offer
            .get("availability")
            .and_then(Value::as_str)
            .is_some_and(|availability| availability.contains("InStock"));
        if in_stock {
            available.push(size.clone());
        }
        all.push(size);
    }

    if all.is_empty() {
        return (SIZE_UNIQUE.to_string(), SIZE_UNIQUE.to_string());
    }

    // Canonicalize where the policy knows the tokens; fall back to document
    // order for vocabularies outside the priority table.
    let all = order_sizes(&all).unwrap_or(all);
    let available = order_sizes(&available).unwrap_or(available);
    (canonical_join(&all), canonical_join(&available))
}
