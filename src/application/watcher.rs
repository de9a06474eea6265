//! The watch cycle: scrape, detect, persist, notify
//!
//! One cycle pulls the full catalog, re-scrapes every product under the
//! bounded scrape pool, filters through the change detector, persists each
//! change together with its history row, resolves watchers, groups them per
//! user and dispatches mail under the bounded mail pool. Phases are strictly
//! sequential: all scrapes and persists complete before grouping and mailing
//! begin.
//!
//! The cycle is best effort - a single product's scrape or persistence
//! failure is logged and excluded, never aborting the cycle or other
//! in-flight items.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::change_detection::is_product_updated;
use crate::domain::entities::{ObservedUpdate, Product, ProductSnapshot, WatchedProduct, Watcher};
use crate::domain::errors::WatchError;
use crate::domain::repositories::ProductRepository;
use crate::infrastructure::mailer::Mailer;
use crate::infrastructure::scrapers::ScraperRegistry;

use super::notifier::{group_by_user, NotificationDispatcher};
use super::worker_pool::WorkerPool;

/// Outcome of one watch cycle, surfaced to the operational trigger.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub updated_product_ids: Vec<String>,
    pub emails_sent: usize,
}

impl CycleReport {
    /// The aggregate status message the trigger's caller sees.
    pub fn message(&self) -> String {
        if self.updated_product_ids.is_empty() {
            "No products were updated.".to_string()
        } else {
            format!(
                "{} product(s) updated: {}.",
                self.updated_product_ids.len(),
                self.updated_product_ids.join(", ")
            )
        }
    }
}

/// Seam between the scheduler and the cycle implementation.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport, WatchError>;
}

/// Orchestrates the periodic product-watching pipeline.
pub struct ProductWatcher {
    products: Arc<dyn ProductRepository>,
    scrapers: Arc<ScraperRegistry>,
    scrape_pool: WorkerPool,
    dispatcher: NotificationDispatcher,
    // Serializes overlapping cycle invocations (scheduled + manual trigger):
    // the second caller waits rather than interleaving with the first.
    cycle_guard: tokio::sync::Mutex<()>,
}

impl ProductWatcher {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        scrapers: Arc<ScraperRegistry>,
        mailer: Arc<dyn Mailer>,
        concurrency: usize,
        mail_subject: impl Into<String>,
    ) -> Self {
        Self {
            products,
            scrapers,
            scrape_pool: WorkerPool::new(concurrency),
            dispatcher: NotificationDispatcher::new(mailer, concurrency, mail_subject),
            cycle_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs exactly one watch cycle over the full catalog.
    ///
    /// Only a catalog read failure is surfaced; everything downstream is
    /// handled per item and reported through the aggregate [`CycleReport`].
    pub async fn run_cycle(&self) -> Result<CycleReport, WatchError> {
        let _cycle = self.cycle_guard.lock().await;

        let catalog = self
            .products
            .find_all()
            .await
            .map_err(|error| WatchError::database("find_all", error))?;
        tracing::info!("Watch cycle started over {} product(s)", catalog.len());

        let scraped = self.scrape_catalog(catalog).await;
        let changed: Vec<(Product, ProductSnapshot)> = scraped
            .into_iter()
            .filter_map(|(watched, snapshot)| {
                let snapshot = snapshot?;
                is_product_updated(Some(&snapshot), &watched.product)
                    .then_some((watched.product, snapshot))
            })
            .collect();

        if changed.is_empty() {
            tracing::info!("Watch cycle finished: no products changed");
            return Ok(CycleReport::default());
        }

        let updated = self.persist_changes(changed).await;
        let watchers = self.resolve_watchers(&updated).await;
        let notifications = group_by_user(watchers);
        let emails_sent = self.dispatcher.dispatch(notifications).await;

        let report = CycleReport {
            updated_product_ids: updated.into_iter().map(|product| product.id).collect(),
            emails_sent,
        };
        tracing::info!("Watch cycle finished: {}", report.message());
        Ok(report)
    }

    /// Phase 1: re-scrape every catalog product under the bounded pool.
    async fn scrape_catalog(
        &self,
        catalog: Vec<WatchedProduct>,
    ) -> Vec<(WatchedProduct, Option<ProductSnapshot>)> {
        let scrapers = Arc::clone(&self.scrapers);
        self.scrape_pool
            .run(catalog, move |watched| {
                let scrapers = Arc::clone(&scrapers);
                async move {
                    let snapshot = match scrapers.resolve(watched.product.store) {
                        Some(scraper) => {
                            match scraper.scrape(&watched.product.url, false).await {
                                Ok(Some(snapshot)) => Some(snapshot),
                                Ok(None) => {
                                    tracing::warn!(
                                        "No product data at {} ({}), treating as unchanged",
                                        watched.product.url,
                                        watched.product.store
                                    );
                                    None
                                }
                                Err(error) => {
                                    tracing::warn!(
                                        "Failed to fetch data from {} (url: {}): {error:#}. \
                                         Treating as unchanged",
                                        watched.product.store,
                                        watched.product.url
                                    );
                                    None
                                }
                            }
                        }
                        None => {
                            tracing::error!(
                                "No scraper capability registered for {}",
                                watched.product.store
                            );
                            None
                        }
                    };
                    (watched, snapshot)
                }
            })
            .await
    }

    /// Phase 2: persist every detected change; the product row and its
    /// history row land in one transaction per product. A persistence
    /// failure drops the item for this cycle - its stored state is unchanged
    /// and it will diff as changed again next cycle.
    async fn persist_changes(&self, changed: Vec<(Product, ProductSnapshot)>) -> Vec<Product> {
        let products = Arc::clone(&self.products);
        self.scrape_pool
            .run(changed, move |(product, snapshot)| {
                let products = Arc::clone(&products);
                async move {
                    let update = ObservedUpdate::from_snapshot(&snapshot);
                    match products.update_observed(&product.id, &update).await {
                        Ok(updated) => Some(updated),
                        Err(error) => {
                            tracing::warn!(
                                "Failed while executing DB action update_observed for {}: \
                                 {error:#}. Will retry next cycle",
                                product.id
                            );
                            None
                        }
                    }
                }
            })
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Phase 3: resolve the watcher list of every updated product.
    async fn resolve_watchers(&self, updated: &[Product]) -> Vec<Watcher> {
        let products = Arc::clone(&self.products);
        self.scrape_pool
            .run(updated.to_vec(), move |product| {
                let products = Arc::clone(&products);
                async move {
                    match products.watchers_of(&product.id).await {
                        Ok(watchers) => watchers,
                        Err(error) => {
                            tracing::warn!(
                                "Failed while executing DB action watchers_of for {}: {error:#}",
                                product.id
                            );
                            Vec::new()
                        }
                    }
                }
            })
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[async_trait]
impl CycleRunner for ProductWatcher {
    async fn run_cycle(&self) -> Result<CycleReport, WatchError> {
        ProductWatcher::run_cycle(self).await
    }
}
