//! Database connection and pool management
//!
//! SQLite connections via sqlx. Foreign keys are enabled on every
//! connection so `product_history` cascades with its product row.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create the database file directory if it doesn't exist
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to connect to the database")?;

        Ok(Self { pool })
    }

    /// A single-connection in-memory database, used by the test suites.
    /// One connection is mandatory: each in-memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL UNIQUE,
                city TEXT,
                zip_code TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                store_product_id TEXT NOT NULL,
                store TEXT NOT NULL,
                url TEXT NOT NULL,
                name TEXT NOT NULL,
                photo_url TEXT NOT NULL DEFAULT '',
                currency TEXT NOT NULL,
                original_price INTEGER NOT NULL,
                current_price INTEGER NOT NULL,
                all_sizes TEXT NOT NULL,
                available_sizes TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                UNIQUE (store, store_product_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL REFERENCES products (id) ON DELETE CASCADE,
                original_price INTEGER NOT NULL,
                current_price INTEGER NOT NULL,
                available_sizes TEXT NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product_users (
                product_id TEXT NOT NULL REFERENCES products (id) ON DELETE CASCADE,
                user_id TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                sizes_to_watch TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                PRIMARY KEY (product_id, user_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_product_history_product_id
                ON product_history (product_id)",
            "CREATE INDEX IF NOT EXISTS idx_product_users_user_id
                ON product_users (user_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run schema migration")?;
        }
        Ok(())
    }
}
