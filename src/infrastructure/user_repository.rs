//! SQLite implementation of the user repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::entities::User;
use crate::domain::repositories::UserRepository;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    city: Option<String>,
    zip_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            city: row.city,
            zip_code: row.zip_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, city, zip_code, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.city)
        .bind(&user.zip_code)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert the user")?;
        Ok(())
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, city, zip_code, created_at, updated_at \
             FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look the user up")?;
        Ok(row.map(User::from))
    }

    async fn update_profile(&self, user: &User) -> Result<()> {
        sqlx::query(
            "UPDATE users SET name = ?, city = ?, zip_code = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.city)
        .bind(&user.zip_code)
        .bind(Utc::now())
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .context("Failed to update the user profile")?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        // Subscriptions cascade; products without any remaining watcher are
        // cleaned up here as well.
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete the user")?;
        sqlx::query(
            "DELETE FROM products WHERE id NOT IN (SELECT product_id FROM product_users)",
        )
        .execute(&mut *tx)
        .await
        .context("Failed to delete orphaned products")?;
        tx.commit().await?;
        Ok(())
    }
}
