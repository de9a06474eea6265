//! Watch registration and subscription management
//!
//! The initial product-registration flow reuses the scraper capability with
//! `is_initial_fetch = true`, letting adapters apply cold-fetch wait rules.
//! Validation errors (unsupported store, unavailable sizes) are surfaced
//! with enough detail for the caller to correct input - never silently
//! dropped or defaulted.

use std::sync::Arc;

use anyhow::anyhow;

use crate::domain::change_detection::is_product_updated;
use crate::domain::entities::{
    NewProduct, ObservedUpdate, ProductUser, RemovedWatch, UserProduct,
};
use crate::domain::errors::WatchError;
use crate::domain::repositories::{ProductRepository, SortBy, SortOrder, UserRepository};
use crate::domain::sizes::validate_watch_sizes;
use crate::domain::store::Store;
use crate::infrastructure::scrapers::ScraperRegistry;

pub struct WatchRegistration {
    products: Arc<dyn ProductRepository>,
    users: Arc<dyn UserRepository>,
    scrapers: Arc<ScraperRegistry>,
}

impl WatchRegistration {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        users: Arc<dyn UserRepository>,
        scrapers: Arc<ScraperRegistry>,
    ) -> Self {
        Self {
            products,
            users,
            scrapers,
        }
    }

    /// Starts watching the product behind `url` for `user_id`.
    ///
    /// Resolves the store, performs a cold scrape, validates the requested
    /// sizes against the product's vocabulary, then either creates the
    /// product (with its first history row) or attaches a subscription to
    /// the already-tracked product - persisting any freshly observed change
    /// first so the stored values stay current.
    pub async fn watch_product(
        &self,
        user_id: &str,
        url: &str,
        sizes_to_watch: &str,
    ) -> Result<UserProduct, WatchError> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(|error| WatchError::database("find_user", error))?
            .ok_or_else(|| WatchError::UserNotFound {
                user_id: user_id.to_string(),
            })?;

        let store = Store::for_url(url)?;
        let scraper =
            self.scrapers
                .resolve(store)
                .ok_or_else(|| WatchError::Scrape {
                    store,
                    url: url.to_string(),
                    source: anyhow!("no scraper capability registered"),
                })?;
        let snapshot = scraper
            .scrape(url, true)
            .await
            .map_err(|source| WatchError::Scrape {
                store,
                url: url.to_string(),
                source,
            })?
            .ok_or_else(|| WatchError::ProductNotFound {
                url: url.to_string(),
            })?;

        let canonical_sizes = validate_watch_sizes(&snapshot.all_sizes, sizes_to_watch, url)?;

        let existing = self
            .products
            .find_by_store_item(store, &snapshot.store_product_id)
            .await
            .map_err(|error| WatchError::database("find_by_store_item", error))?;

        let product = match existing {
            None => {
                let new_product = NewProduct {
                    store,
                    url: url.to_string(),
                    snapshot,
                };
                self.products
                    .create_with_watcher(&new_product, user_id, &canonical_sizes)
                    .await
                    .map_err(|error| WatchError::database("create_with_watcher", error))?
            }
            Some(product) => {
                let product = if is_product_updated(Some(&snapshot), &product) {
                    self.products
                        .update_observed(&product.id, &ObservedUpdate::from_snapshot(&snapshot))
                        .await
                        .map_err(|error| WatchError::database("update_observed", error))?
                } else {
                    product
                };

                let already_watching = self
                    .products
                    .find_watch(user_id, &product.id)
                    .await
                    .map_err(|error| WatchError::database("find_watch", error))?
                    .is_some();
                if already_watching {
                    return Err(WatchError::AlreadyWatching {
                        user_id: user_id.to_string(),
                        url: url.to_string(),
                    });
                }

                self.products
                    .add_watcher(&product.id, user_id, &canonical_sizes)
                    .await
                    .map_err(|error| WatchError::database("add_watcher", error))?;
                product
            }
        };

        Ok(UserProduct {
            product,
            sizes_to_watch: canonical_sizes,
            history: Vec::new(),
        })
    }

    /// Replaces the sizes a user watches on an already-watched product.
    pub async fn update_watch_sizes(
        &self,
        user_id: &str,
        product_id: &str,
        sizes_to_watch: &str,
    ) -> Result<ProductUser, WatchError> {
        let watched = self
            .products
            .find_for_user(user_id, product_id)
            .await
            .map_err(|error| WatchError::database("find_for_user", error))?
            .ok_or_else(|| WatchError::WatchNotFound {
                user_id: user_id.to_string(),
                product_id: product_id.to_string(),
            })?;

        let canonical_sizes = validate_watch_sizes(
            &watched.product.all_sizes,
            sizes_to_watch,
            &watched.product.url,
        )?;

        self.products
            .update_watch_sizes(user_id, product_id, &canonical_sizes)
            .await
            .map_err(|error| WatchError::database("update_watch_sizes", error))?
            .ok_or_else(|| WatchError::WatchNotFound {
                user_id: user_id.to_string(),
                product_id: product_id.to_string(),
            })
    }

    /// Unsubscribes a user; the product (and its history) is deleted when
    /// the last watcher leaves, so no orphaned catalog entries remain.
    pub async fn unwatch_product(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> Result<RemovedWatch, WatchError> {
        self.products
            .remove_watcher(user_id, product_id)
            .await
            .map_err(|error| WatchError::database("remove_watcher", error))?
            .ok_or_else(|| WatchError::WatchNotFound {
                user_id: user_id.to_string(),
                product_id: product_id.to_string(),
            })
    }

    /// Pages through the products a user watches.
    pub async fn products_of_user(
        &self,
        user_id: &str,
        sort_by: SortBy,
        sort_order: SortOrder,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<UserProduct>, u32), WatchError> {
        self.products
            .list_for_user(user_id, sort_by, sort_order, limit, offset)
            .await
            .map_err(|error| WatchError::database("list_for_user", error))
    }

    /// One watched product with its full observation history.
    pub async fn product_detail(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> Result<UserProduct, WatchError> {
        self.products
            .find_for_user(user_id, product_id)
            .await
            .map_err(|error| WatchError::database("find_for_user", error))?
            .ok_or_else(|| WatchError::WatchNotFound {
                user_id: user_id.to_string(),
                product_id: product_id.to_string(),
            })
    }
}
