//! Classified error taxonomy for the watch pipeline
//!
//! Mid-cycle failures (scrape, persistence, mail) are logged and absorbed by
//! the cycle; the variants here are the caller-visible errors surfaced by the
//! registration path and the cycle trigger.

use crate::domain::store::Store;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Store not supported for the URL {url}.")]
    StoreNotSupported { url: String },

    #[error("Product not found for the provided URL {url}.")]
    ProductNotFound { url: String },

    #[error("Size(s) {} not available for product with URL {url}.", sizes.join(","))]
    SizesNotAvailable { sizes: Vec<String>, url: String },

    #[error("Size {size:?} is not an accepted size token.")]
    UnknownSize { size: String },

    #[error("User {user_id} is already watching the product of URL {url}.")]
    AlreadyWatching { user_id: String, url: String },

    #[error("Product {product_id} not found for user {user_id}.")]
    WatchNotFound { user_id: String, product_id: String },

    #[error("User {user_id} not found.")]
    UserNotFound { user_id: String },

    #[error("Failed to fetch data from {store} (url: {url}): {source}.")]
    Scrape {
        store: Store,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed while executing DB action {action}: {source}.")]
    Database {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to send e-mail to {email}: {source}.")]
    Mail {
        email: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WatchError {
    /// Wraps a persistence failure with the repository action that produced it.
    pub fn database(action: &'static str, source: anyhow::Error) -> Self {
        WatchError::Database { action, source }
    }
}
