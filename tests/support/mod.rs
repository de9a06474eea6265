//! Shared fixtures for the integration suites: an in-memory database, a
//! programmable scraper and a recording mail transport.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use product_watcher::application::registration::WatchRegistration;
use product_watcher::application::watcher::ProductWatcher;
use product_watcher::domain::entities::{ProductSnapshot, User};
use product_watcher::domain::repositories::UserRepository;
use product_watcher::infrastructure::database_connection::DatabaseConnection;
use product_watcher::infrastructure::mailer::Mailer;
use product_watcher::infrastructure::product_repository::SqliteProductRepository;
use product_watcher::infrastructure::scrapers::{ProductScraper, ScraperRegistry};
use product_watcher::infrastructure::user_repository::SqliteUserRepository;

/// What the mock scraper answers for one URL.
#[derive(Clone)]
pub enum PageState {
    Product(ProductSnapshot),
    NoProductData,
    FetchFails,
}

/// Scraper whose per-URL behavior tests reprogram between cycles.
#[derive(Default)]
pub struct MockScraper {
    pages: Mutex<HashMap<String, PageState>>,
}

impl MockScraper {
    pub async fn set_page(&self, url: &str, state: PageState) {
        self.pages.lock().await.insert(url.to_string(), state);
    }
}

#[async_trait]
impl ProductScraper for MockScraper {
    async fn scrape(&self, url: &str, _is_initial_fetch: bool) -> Result<Option<ProductSnapshot>> {
        match self.pages.lock().await.get(url) {
            Some(PageState::Product(snapshot)) => Ok(Some(snapshot.clone())),
            Some(PageState::NoProductData) | None => Ok(None),
            Some(PageState::FetchFails) => Err(anyhow::anyhow!("connection reset")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mail transport that records every send; addresses in `failing` reject.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub async fn fail_for(&self, email: &str) {
        self.failing.lock().await.insert(email.to_string());
    }

    pub async fn mails(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        if self.failing.lock().await.contains(to) {
            anyhow::bail!("mailbox unavailable");
        }
        self.sent.lock().await.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct TestEnv {
    pub products: Arc<SqliteProductRepository>,
    pub users: Arc<SqliteUserRepository>,
    pub scraper: Arc<MockScraper>,
    pub mailer: Arc<RecordingMailer>,
    pub registration: WatchRegistration,
    pub watcher: ProductWatcher,
    // Keeps the single in-memory connection alive for the test's duration.
    _db: DatabaseConnection,
}

pub async fn test_env() -> TestEnv {
    let db = DatabaseConnection::in_memory().await.unwrap();
    db.migrate().await.unwrap();

    let products = Arc::new(SqliteProductRepository::new(db.pool().clone()));
    let users = Arc::new(SqliteUserRepository::new(db.pool().clone()));
    let scraper = Arc::new(MockScraper::default());
    let mailer = Arc::new(RecordingMailer::default());

    let registry = {
        let scraper: Arc<dyn ProductScraper> = Arc::clone(&scraper) as Arc<dyn ProductScraper>;
        Arc::new(ScraperRegistry::from_fn(move |_| -> Arc<dyn ProductScraper> {
            Arc::clone(&scraper)
        }))
    };

    let registration = WatchRegistration::new(
        products.clone(),
        users.clone(),
        Arc::clone(&registry),
    );
    let watcher = ProductWatcher::new(
        products.clone(),
        Arc::clone(&registry),
        mailer.clone(),
        10,
        "Available Products",
    );

    TestEnv {
        products,
        users,
        scraper,
        mailer,
        registration,
        watcher,
        _db: db,
    }
}

pub async fn create_user(env: &TestEnv, id: &str, email: &str) {
    let now = Utc::now();
    env.users
        .create(&User {
            id: id.to_string(),
            name: format!("User {id}"),
            email: email.to_string(),
            city: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

pub fn snapshot(sku: &str, name: &str, price_cents: i64, available_sizes: &str) -> ProductSnapshot {
    ProductSnapshot {
        store_product_id: sku.to_string(),
        name: name.to_string(),
        original_price: price_cents,
        current_price: price_cents,
        currency: "EUR".to_string(),
        all_sizes: "XS,S,M,L".to_string(),
        available_sizes: available_sizes.to_string(),
        photo_url: format!("https://cdn.example/{sku}.jpg"),
    }
}
