//! Change detection between a fresh scrape snapshot and the stored product
//!
//! Pure comparison, no I/O. A persist + notify cycle is warranted iff the
//! minor-unit current price differs or the canonical available-size string
//! differs. Upstream always canonicalizes sizes before storing, so string
//! equality is the contract here, not set equality.

use crate::domain::entities::{Product, ProductSnapshot};

/// Returns whether the freshly scraped snapshot warrants a persist + notify
/// cycle for the stored product.
///
/// An absent snapshot means the scrape failed and carries no information -
/// never "the product changed to empty".
pub fn is_product_updated(snapshot: Option<&ProductSnapshot>, product: &Product) -> bool {
    let Some(snapshot) = snapshot else {
        return false;
    };
    snapshot.current_price != product.current_price
        || snapshot.available_sizes != product.available_sizes
}
