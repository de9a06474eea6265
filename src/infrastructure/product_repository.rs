//! SQLite implementation of the product repository
//!
//! Row shapes stay private to this module; persisted values are mapped into
//! domain entities exactly once, here. Observed updates land in a single
//! transaction together with their history row, and the last watcher's
//! departure deletes the product (history cascades via foreign keys).

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::entities::{
    NewProduct, ObservedUpdate, Product, ProductHistory, ProductUser, RemovedWatch, UserProduct,
    WatchedProduct, Watcher,
};
use crate::domain::entities::ProductSummary;
use crate::domain::repositories::{ProductRepository, SortBy, SortOrder};
use crate::domain::store::Store;

const PRODUCT_COLUMNS: &str = "id, store_product_id, store, url, name, photo_url, currency, \
     original_price, current_price, all_sizes, available_sizes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    store_product_id: String,
    store: String,
    url: String,
    name: String,
    photo_url: String,
    currency: String,
    original_price: i64,
    current_price: i64,
    all_sizes: String,
    available_sizes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product> {
        Ok(Product {
            store: Store::parse(&self.store)?,
            id: self.id,
            store_product_id: self.store_product_id,
            url: self.url,
            name: self.name,
            photo_url: self.photo_url,
            currency: self.currency,
            original_price: self.original_price,
            current_price: self.current_price,
            all_sizes: self.all_sizes,
            available_sizes: self.available_sizes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WatcherRow {
    user_id: String,
    email: String,
    product_id: String,
    name: String,
    url: String,
    store: String,
    photo_url: String,
    available_sizes: String,
    current_price: i64,
    currency: String,
}

impl WatcherRow {
    fn into_watcher(self) -> Result<Watcher> {
        Ok(Watcher {
            product: ProductSummary {
                id: self.product_id,
                name: self.name,
                url: self.url,
                store: Store::parse(&self.store)?,
                photo_url: self.photo_url,
                available_sizes: self.available_sizes,
                current_price: self.current_price,
                currency: self.currency,
            },
            user_id: self.user_id,
            email: self.email,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductUserRow {
    product_id: String,
    user_id: String,
    sizes_to_watch: String,
    created_at: DateTime<Utc>,
}

impl From<ProductUserRow> for ProductUser {
    fn from(row: ProductUserRow) -> Self {
        ProductUser {
            product_id: row.product_id,
            user_id: row.user_id,
            sizes_to_watch: row.sizes_to_watch,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    original_price: i64,
    current_price: i64,
    available_sizes: String,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for ProductHistory {
    fn from(row: HistoryRow) -> Self {
        ProductHistory {
            original_price: row.original_price,
            current_price: row.current_price,
            available_sizes: row.available_sizes,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn history_of(&self, product_id: &str) -> Result<Vec<ProductHistory>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT original_price, current_price, available_sizes, created_at \
             FROM product_history WHERE product_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load product history")?;
        Ok(rows.into_iter().map(ProductHistory::from).collect())
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn find_all(&self) -> Result<Vec<WatchedProduct>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to load the product catalog")?;

        let watch_rows: Vec<(String, String)> =
            sqlx::query_as("SELECT product_id, sizes_to_watch FROM product_users")
                .fetch_all(&self.pool)
                .await
                .context("Failed to load watch subscriptions")?;
        let mut sizes_by_product: HashMap<String, Vec<String>> = HashMap::new();
        for (product_id, sizes) in watch_rows {
            sizes_by_product.entry(product_id).or_default().push(sizes);
        }

        rows.into_iter()
            .map(|row| {
                let watch_sizes = sizes_by_product.remove(&row.id).unwrap_or_default();
                Ok(WatchedProduct {
                    product: row.into_product()?,
                    watch_sizes,
                })
            })
            .collect()
    }

    async fn find_by_store_item(
        &self,
        store: Store,
        store_product_id: &str,
    ) -> Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE store = ? AND store_product_id = ?"
        ))
        .bind(store.as_str())
        .bind(store_product_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look the product up by store identity")?;
        row.map(ProductRow::into_product).transpose()
    }

    async fn create_with_watcher(
        &self,
        new_product: &NewProduct,
        user_id: &str,
        sizes_to_watch: &str,
    ) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let snapshot = &new_product.snapshot;

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&snapshot.store_product_id)
        .bind(new_product.store.as_str())
        .bind(&new_product.url)
        .bind(&snapshot.name)
        .bind(&snapshot.photo_url)
        .bind(&snapshot.currency)
        .bind(snapshot.original_price)
        .bind(snapshot.current_price)
        .bind(&snapshot.all_sizes)
        .bind(&snapshot.available_sizes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to insert the product")?;

        sqlx::query(
            "INSERT INTO product_history \
             (product_id, original_price, current_price, available_sizes, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(snapshot.original_price)
        .bind(snapshot.current_price)
        .bind(&snapshot.available_sizes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to insert the first history row")?;

        sqlx::query(
            "INSERT INTO product_users (product_id, user_id, sizes_to_watch, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(sizes_to_watch)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to insert the watch subscription")?;

        tx.commit().await?;

        Ok(Product {
            id,
            store_product_id: snapshot.store_product_id.clone(),
            store: new_product.store,
            url: new_product.url.clone(),
            name: snapshot.name.clone(),
            photo_url: snapshot.photo_url.clone(),
            currency: snapshot.currency.clone(),
            original_price: snapshot.original_price,
            current_price: snapshot.current_price,
            all_sizes: snapshot.all_sizes.clone(),
            available_sizes: snapshot.available_sizes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_observed(&self, product_id: &str, update: &ObservedUpdate) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products \
             SET current_price = ?, original_price = ?, available_sizes = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(update.current_price)
        .bind(update.original_price)
        .bind(&update.available_sizes)
        .bind(now)
        .bind(product_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update the product")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("product {product_id} does not exist");
        }

        sqlx::query(
            "INSERT INTO product_history \
             (product_id, original_price, current_price, available_sizes, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(update.original_price)
        .bind(update.current_price)
        .bind(&update.available_sizes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to append the history row")?;

        let row: ProductRow = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to re-read the updated product")?;

        tx.commit().await?;
        row.into_product()
    }

    async fn watchers_of(&self, product_id: &str) -> Result<Vec<Watcher>> {
        let rows: Vec<WatcherRow> = sqlx::query_as(
            "SELECT pu.user_id AS user_id, u.email AS email, p.id AS product_id, \
                    p.name AS name, p.url AS url, p.store AS store, \
                    p.photo_url AS photo_url, p.available_sizes AS available_sizes, \
                    p.current_price AS current_price, p.currency AS currency \
             FROM product_users pu \
             JOIN users u ON u.id = pu.user_id \
             JOIN products p ON p.id = pu.product_id \
             WHERE pu.product_id = ? \
             ORDER BY pu.created_at ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to resolve product watchers")?;
        rows.into_iter().map(WatcherRow::into_watcher).collect()
    }

    async fn find_watch(&self, user_id: &str, product_id: &str) -> Result<Option<ProductUser>> {
        let row: Option<ProductUserRow> = sqlx::query_as(
            "SELECT product_id, user_id, sizes_to_watch, created_at \
             FROM product_users WHERE user_id = ? AND product_id = ?",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look the watch subscription up")?;
        Ok(row.map(ProductUser::from))
    }

    async fn add_watcher(
        &self,
        product_id: &str,
        user_id: &str,
        sizes_to_watch: &str,
    ) -> Result<ProductUser> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO product_users (product_id, user_id, sizes_to_watch, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(sizes_to_watch)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to insert the watch subscription")?;
        Ok(ProductUser {
            product_id: product_id.to_string(),
            user_id: user_id.to_string(),
            sizes_to_watch: sizes_to_watch.to_string(),
            created_at: now,
        })
    }

    async fn update_watch_sizes(
        &self,
        user_id: &str,
        product_id: &str,
        sizes_to_watch: &str,
    ) -> Result<Option<ProductUser>> {
        let result = sqlx::query(
            "UPDATE product_users SET sizes_to_watch = ? \
             WHERE user_id = ? AND product_id = ?",
        )
        .bind(sizes_to_watch)
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .context("Failed to update the watched sizes")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_watch(user_id, product_id).await
    }

    async fn remove_watcher(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> Result<Option<RemovedWatch>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM product_users WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete the watch subscription")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        // Delete the product if no more users are watching it; its history
        // cascades with it.
        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_users WHERE product_id = ?")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to count remaining watchers")?;
        let product_deleted = remaining == 0;
        if product_deleted {
            sqlx::query("DELETE FROM products WHERE id = ?")
                .bind(product_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete the orphaned product")?;
        }

        tx.commit().await?;
        Ok(Some(RemovedWatch { product_deleted }))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        sort_by: SortBy,
        sort_order: SortOrder,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<UserProduct>, u32)> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_users WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count the user's products")?;

        // Sort columns come from a closed enum, never from caller input.
        let column = match sort_by {
            SortBy::UpdatedAt => "p.updated_at",
            SortBy::Name => "p.name",
            SortBy::Store => "p.store",
        };
        let direction = match sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let rows: Vec<(String, ProductRow)> = sqlx::query_as::<_, UserProductRow>(&format!(
            "SELECT p.id AS id, p.store_product_id AS store_product_id, p.store AS store, \
                    p.url AS url, p.name AS name, p.photo_url AS photo_url, \
                    p.currency AS currency, p.original_price AS original_price, \
                    p.current_price AS current_price, p.all_sizes AS all_sizes, \
                    p.available_sizes AS available_sizes, p.created_at AS created_at, \
                    p.updated_at AS updated_at, pu.sizes_to_watch AS sizes_to_watch \
             FROM products p \
             JOIN product_users pu ON pu.product_id = p.id \
             WHERE pu.user_id = ? \
             ORDER BY {column} {direction} \
             LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list the user's products")?
        .into_iter()
        .map(|row| (row.sizes_to_watch, row.product))
        .collect();

        let products = rows
            .into_iter()
            .map(|(sizes_to_watch, row)| {
                Ok(UserProduct {
                    product: row.into_product()?,
                    sizes_to_watch,
                    history: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((products, u32::try_from(count).unwrap_or(0)))
    }

    async fn find_for_user(&self, user_id: &str, product_id: &str) -> Result<Option<UserProduct>> {
        let row: Option<UserProductRow> = sqlx::query_as(
            "SELECT p.id AS id, p.store_product_id AS store_product_id, p.store AS store, \
                    p.url AS url, p.name AS name, p.photo_url AS photo_url, \
                    p.currency AS currency, p.original_price AS original_price, \
                    p.current_price AS current_price, p.all_sizes AS all_sizes, \
                    p.available_sizes AS available_sizes, p.created_at AS created_at, \
                    p.updated_at AS updated_at, pu.sizes_to_watch AS sizes_to_watch \
             FROM products p \
             JOIN product_users pu ON pu.product_id = p.id \
             WHERE pu.user_id = ? AND p.id = ?",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load the user's product")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let history = self.history_of(product_id).await?;
        Ok(Some(UserProduct {
            sizes_to_watch: row.sizes_to_watch,
            product: row.product.into_product()?,
            history,
        }))
    }
}

/// Joined product + subscription row for the per-user views.
struct UserProductRow {
    product: ProductRow,
    sizes_to_watch: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for UserProductRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::{FromRow, Row};
        Ok(Self {
            product: ProductRow::from_row(row)?,
            sizes_to_watch: row.try_get("sizes_to_watch")?,
        })
    }
}
