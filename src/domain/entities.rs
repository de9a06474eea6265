//! Domain entities for products, watch subscriptions and scrape snapshots
//!
//! Persisted rows are mapped into these shapes exactly once, at the
//! repository boundary, so canonicalization (size ordering, minor-unit
//! prices) never happens ad hoc at call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::store::Store;

/// A tracked catalog product. `current_price` and `available_sizes` always
/// hold the most recent observed values; every change to either appends a
/// [`ProductHistory`] row in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// The store's own identifier for the product.
    pub store_product_id: String,
    pub store: Store,
    pub url: String,
    pub name: String,
    pub photo_url: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Minor units (cents).
    pub original_price: i64,
    /// Minor units (cents).
    pub current_price: i64,
    /// Canonical comma-joined full size set, or the `UNIQUE` sentinel.
    pub all_sizes: String,
    /// Canonical comma-joined subset of `all_sizes` currently in stock.
    pub available_sizes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only price/availability observation. Immutable once written,
/// ordered by `created_at`, deleted only by cascading with its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductHistory {
    pub original_price: i64,
    pub current_price: i64,
    pub available_sizes: String,
    pub created_at: DateTime<Utc>,
}

/// A (user, product) watch subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUser {
    pub product_id: String,
    pub user_id: String,
    /// Ordered, deduplicated subset of the product's size vocabulary,
    /// or `UNIQUE` for sizeless products.
    pub sizes_to_watch: String,
    pub created_at: DateTime<Utc>,
}

/// A registered user owning zero or more watch subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalized, transient output of a single scrape operation. Never persisted
/// directly - always diffed against the stored [`Product`], then merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub store_product_id: String,
    pub name: String,
    pub original_price: i64,
    pub current_price: i64,
    pub currency: String,
    pub all_sizes: String,
    pub available_sizes: String,
    pub photo_url: String,
}

/// Everything needed to insert a brand-new product row.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub store: Store,
    pub url: String,
    pub snapshot: ProductSnapshot,
}

/// The observed values persisted when a change is detected. The repository
/// applies them to the product row and appends the history row atomically.
#[derive(Debug, Clone)]
pub struct ObservedUpdate {
    pub original_price: i64,
    pub current_price: i64,
    pub available_sizes: String,
}

impl ObservedUpdate {
    pub fn from_snapshot(snapshot: &ProductSnapshot) -> Self {
        Self {
            original_price: snapshot.original_price,
            current_price: snapshot.current_price,
            available_sizes: snapshot.available_sizes.clone(),
        }
    }
}

/// A catalog product together with its watchers' size selections, the shape
/// the watch cycle pulls from persistence.
#[derive(Debug, Clone)]
pub struct WatchedProduct {
    pub product: Product,
    /// One canonical sizes-to-watch string per watcher.
    pub watch_sizes: Vec<String>,
}

/// Slim product shape embedded in watcher resolution and e-mails.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub url: String,
    pub store: Store,
    pub photo_url: String,
    pub available_sizes: String,
    pub current_price: i64,
    pub currency: String,
}

impl ProductSummary {
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            url: product.url.clone(),
            store: product.store,
            photo_url: product.photo_url.clone(),
            available_sizes: product.available_sizes.clone(),
            current_price: product.current_price,
            currency: product.currency.clone(),
        }
    }
}

/// One watcher of a changed product, resolved from the ProductUser/User join.
#[derive(Debug, Clone)]
pub struct Watcher {
    pub user_id: String,
    pub email: String,
    pub product: ProductSummary,
}

/// A product as seen by one of its watchers (listing / detail views).
#[derive(Debug, Clone)]
pub struct UserProduct {
    pub product: Product,
    pub sizes_to_watch: String,
    /// Populated only for the detail view.
    pub history: Vec<ProductHistory>,
}

/// Outcome of removing a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedWatch {
    /// True when the last watcher left and the product row (with its history)
    /// was deleted as well.
    pub product_deleted: bool,
}
