use std::sync::Arc;

use anyhow::{Context, Result};

use product_watcher::application::scheduler::WatchScheduler;
use product_watcher::application::watcher::{CycleRunner, ProductWatcher};
use product_watcher::infrastructure::config::AppConfig;
use product_watcher::infrastructure::database_connection::DatabaseConnection;
use product_watcher::infrastructure::http_client::{HttpClient, HttpClientConfig};
use product_watcher::infrastructure::logging::init_logging;
use product_watcher::infrastructure::mailer::HttpRelayMailer;
use product_watcher::infrastructure::product_repository::SqliteProductRepository;
use product_watcher::infrastructure::scrapers::{HtmlScraper, ProductScraper, ScraperRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let _log_guard = init_logging(&config.logging)?;

    let db = DatabaseConnection::new(&config.database_url).await?;
    db.migrate().await?;

    let http = Arc::new(HttpClient::new(HttpClientConfig {
        user_agent: config.scraper.user_agent.clone(),
        timeout_seconds: config.scraper.timeout_seconds,
        max_requests_per_second: config.scraper.max_requests_per_second,
    })?);
    let retries = config.scraper.initial_fetch_retries;
    let scrapers = Arc::new(ScraperRegistry::from_fn(|_| -> Arc<dyn ProductScraper> {
        Arc::new(HtmlScraper::new(Arc::clone(&http), retries))
    }));
    let mailer = HttpRelayMailer::from_config(&config.mail)?;

    let products = Arc::new(SqliteProductRepository::new(db.pool().clone()));
    let watcher: Arc<dyn CycleRunner> = Arc::new(ProductWatcher::new(
        products,
        scrapers,
        mailer,
        config.watcher.concurrency,
        config.mail.subject.clone(),
    ));

    // `--once` is the manual trigger: run a single cycle and report.
    if std::env::args().any(|argument| argument == "--once") {
        let report = watcher.run_cycle().await?;
        println!("{}", report.message());
        return Ok(());
    }

    let mut scheduler = WatchScheduler::new(
        watcher,
        config.watcher.enabled,
        config.watcher.interval_choices(),
    );
    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for the shutdown signal")?;
    tracing::info!("Shutting down");
    scheduler.stop().await;
    Ok(())
}
