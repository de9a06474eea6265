//! Repository interfaces for the watch pipeline
//!
//! Trait definitions for the persistence collaborator. Each call is a
//! black-box transaction boundary: the core relies on `update_observed`
//! updating the product row and appending its history row atomically, and on
//! `remove_watcher` deleting an orphaned product in the same transaction.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::{
    NewProduct, ObservedUpdate, Product, ProductUser, RemovedWatch, User, UserProduct,
    WatchedProduct, Watcher,
};
use crate::domain::store::Store;

/// Column to order user product listings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    UpdatedAt,
    Name,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Full catalog with each product's watcher size selections, most
    /// recently updated first.
    async fn find_all(&self) -> Result<Vec<WatchedProduct>>;

    /// Looks a product up by its store identity (store, store_product_id).
    async fn find_by_store_item(
        &self,
        store: Store,
        store_product_id: &str,
    ) -> Result<Option<Product>>;

    /// Inserts a new product, its first history row and the creating user's
    /// subscription in one transaction.
    async fn create_with_watcher(
        &self,
        new_product: &NewProduct,
        user_id: &str,
        sizes_to_watch: &str,
    ) -> Result<Product>;

    /// Applies newly observed values and appends the history row atomically.
    /// Returns the updated product.
    async fn update_observed(&self, product_id: &str, update: &ObservedUpdate) -> Result<Product>;

    /// Resolves the current watcher list (ProductUser join User) of a product.
    async fn watchers_of(&self, product_id: &str) -> Result<Vec<Watcher>>;

    async fn find_watch(&self, user_id: &str, product_id: &str) -> Result<Option<ProductUser>>;

    /// Subscribes an existing user to an existing product.
    async fn add_watcher(
        &self,
        product_id: &str,
        user_id: &str,
        sizes_to_watch: &str,
    ) -> Result<ProductUser>;

    /// Replaces a subscription's watched sizes. `None` when no such watch.
    async fn update_watch_sizes(
        &self,
        user_id: &str,
        product_id: &str,
        sizes_to_watch: &str,
    ) -> Result<Option<ProductUser>>;

    /// Removes a subscription; deletes the product (cascading its history)
    /// when the last watcher leaves. `None` when no such watch existed.
    async fn remove_watcher(&self, user_id: &str, product_id: &str)
        -> Result<Option<RemovedWatch>>;

    /// Pages through one user's watched products.
    async fn list_for_user(
        &self,
        user_id: &str,
        sort_by: SortBy,
        sort_order: SortOrder,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<UserProduct>, u32)>;

    /// One watched product with its full history, as seen by one user.
    async fn find_for_user(&self, user_id: &str, product_id: &str) -> Result<Option<UserProduct>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>>;
    /// Updates mutable profile fields (name, city, zip code).
    async fn update_profile(&self, user: &User) -> Result<()>;
    async fn delete(&self, user_id: &str) -> Result<()>;
}
