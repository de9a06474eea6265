//! Domain module - Core business logic and entities
//!
//! Everything in here is pure: entities, the store vocabulary, the size
//! ordering policy, money conversion and change detection carry no I/O and
//! are testable with literal fixtures. Repository traits define the
//! persistence seam the application layer depends on.

pub mod change_detection;
pub mod entities;
pub mod errors;
pub mod money;
pub mod repositories;
pub mod sizes;
pub mod store;

// Re-export commonly used items
pub use change_detection::is_product_updated;
pub use entities::{
    NewProduct, ObservedUpdate, Product, ProductHistory, ProductSnapshot, ProductSummary,
    ProductUser, RemovedWatch, User, UserProduct, WatchedProduct, Watcher,
};
pub use errors::WatchError;
pub use store::Store;
