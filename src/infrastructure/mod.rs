//! Infrastructure layer - configuration, persistence and external collaborators
//!
//! SQLite-backed repository implementations, the rate-limited HTTP client,
//! the scraper capability registry, the mail transport and the logging /
//! configuration plumbing the application layer is wired with.

pub mod config;
pub mod database_connection;
pub mod http_client;
pub mod logging;
pub mod mailer;
pub mod product_repository;
pub mod scrapers;
pub mod user_repository;

// Re-export commonly used items
pub use config::AppConfig;
pub use database_connection::DatabaseConnection;
pub use http_client::{HttpClient, HttpClientConfig};
pub use mailer::{HttpRelayMailer, LogMailer, Mailer};
pub use product_repository::SqliteProductRepository;
pub use scrapers::{HtmlScraper, ProductScraper, ScraperRegistry};
pub use user_repository::SqliteUserRepository;
