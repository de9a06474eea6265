//! Notification grouping and mail fan-out
//!
//! Folds the flat (product, watcher) pairs resolved after a cycle into one
//! notification per user, then dispatches mail with bounded concurrency and
//! per-user failure isolation. Presentation formatting (store humanization,
//! price formatting) happens at this boundary and nowhere earlier, so raw
//! values stay canonical until the final output step.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::domain::entities::{ProductSummary, Watcher};
use crate::domain::money::format_price;
use crate::infrastructure::mailer::Mailer;

use super::worker_pool::WorkerPool;

/// A changed product formatted for presentation in a notification e-mail.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedProduct {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Humanized store name ("Mango outlet"), not the canonical enum form.
    pub store: String,
    pub photo_url: String,
    pub available_sizes: String,
    /// Price formatted in display units with currency, e.g. "€19.99".
    pub price: String,
}

impl PresentedProduct {
    pub fn from_summary(summary: &ProductSummary) -> Self {
        Self {
            id: summary.id.clone(),
            name: summary.name.clone(),
            url: summary.url.clone(),
            store: summary.store.display_name(),
            photo_url: summary.photo_url.clone(),
            available_sizes: summary.available_sizes.clone(),
            price: format_price(summary.current_price, &summary.currency),
        }
    }
}

/// One e-mail's worth of changed products for one user.
#[derive(Debug, Clone)]
pub struct UserNotification {
    pub user_id: String,
    pub email: String,
    pub products: Vec<PresentedProduct>,
}

/// Folds watcher resolutions into a per-user notification list.
///
/// The first occurrence of a user creates the entry; subsequent occurrences
/// append to `products` preserving discovery order. Duplicates are not
/// removed - a user watching the same product twice is a data invariant
/// violation, not handled here.
pub fn group_by_user(watchers: Vec<Watcher>) -> Vec<UserNotification> {
    let mut discovery_order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, UserNotification> = HashMap::new();

    for watcher in watchers {
        let presented = PresentedProduct::from_summary(&watcher.product);
        match grouped.entry(watcher.user_id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().products.push(presented),
            Entry::Vacant(entry) => {
                discovery_order.push(watcher.user_id.clone());
                entry.insert(UserNotification {
                    user_id: watcher.user_id,
                    email: watcher.email,
                    products: vec![presented],
                });
            }
        }
    }

    discovery_order
        .into_iter()
        .filter_map(|user_id| grouped.remove(&user_id))
        .collect()
}

/// Renders the notification e-mail body for one user.
pub fn render_update_email(products: &[PresentedProduct]) -> String {
    let mut body = String::from(
        "<html><body><h2>Your watched products changed</h2><ul>",
    );
    for product in products {
        body.push_str(&format!(
            "<li><a href=\"{url}\">{name}</a> ({store}) \
             - {price} - available sizes: {sizes}</li>",
            url = product.url,
            name = product.name,
            store = product.store,
            price = product.price,
            sizes = product.available_sizes,
        ));
    }
    body.push_str("</ul></body></html>");
    body
}

/// Bounded-concurrency mail dispatcher: one e-mail per user, containing all
/// of that user's changed products in a single message.
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    pool: WorkerPool,
    subject: String,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, concurrency: usize, subject: impl Into<String>) -> Self {
        Self {
            mailer,
            pool: WorkerPool::new(concurrency),
            subject: subject.into(),
        }
    }

    /// Sends every notification, isolating per-user failures. A failed send
    /// is logged and dropped: no retry is attempted, and the next cycle will
    /// not resend because the product state is already persisted. Returns
    /// the number of e-mails actually sent.
    pub async fn dispatch(&self, notifications: Vec<UserNotification>) -> usize {
        let mailer = Arc::clone(&self.mailer);
        let subject = self.subject.clone();
        let outcomes = self
            .pool
            .run(notifications, move |notification| {
                let mailer = Arc::clone(&mailer);
                let subject = subject.clone();
                async move {
                    let html = render_update_email(&notification.products);
                    match mailer.send(&notification.email, &subject, &html).await {
                        Ok(()) => {
                            let product_ids: Vec<&str> = notification
                                .products
                                .iter()
                                .map(|product| product.id.as_str())
                                .collect();
                            tracing::info!(
                                "An email was sent to {}, notifying about products {}.",
                                notification.email,
                                product_ids.join(", ")
                            );
                            true
                        }
                        Err(error) => {
                            // Accepted gap: the product update is already
                            // persisted, so this notification is lost for
                            // this cycle and will not be resent.
                            tracing::warn!(
                                "Failed to send e-mail to {}: {error:#}. Notification dropped.",
                                notification.email
                            );
                            false
                        }
                    }
                }
            })
            .await;
        outcomes.into_iter().filter(|sent| *sent).count()
    }
}
