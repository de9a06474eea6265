//! Application layer - watch cycle orchestration and lifecycle
//!
//! Coordinates the domain policies and the infrastructure collaborators:
//! the bounded worker pool, the watch cycle itself, notification grouping
//! and dispatch, the registration flows and the cycle scheduler.

pub mod notifier;
pub mod registration;
pub mod scheduler;
pub mod watcher;
pub mod worker_pool;

// Re-export commonly used items
pub use notifier::{group_by_user, NotificationDispatcher, PresentedProduct, UserNotification};
pub use registration::WatchRegistration;
pub use scheduler::{SchedulerState, WatchScheduler};
pub use watcher::{CycleReport, CycleRunner, ProductWatcher};
pub use worker_pool::WorkerPool;
