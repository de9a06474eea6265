//! Product Watcher - periodic e-commerce product watching pipeline
//!
//! This crate re-scrapes a catalog of tracked products on a randomized
//! schedule, detects meaningful changes (price, size availability), persists
//! new history rows and notifies every user watching an affected product.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
