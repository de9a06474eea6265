//! Supported store vocabulary and URL resolution
//!
//! A product URL is resolved to a [`Store`] by a simple substring match
//! against each variant's lowercase name, with one special-case override
//! (`sprintersports` maps to [`Store::SportZone`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::WatchError;

/// Closed set of stores a product URL can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Store {
    Bershka,
    Decathlon,
    Fifty,
    Lefties,
    MangoOutlet,
    Mango,
    Parfois,
    Springfield,
    SportZone,
    Stradivarius,
    WomenSecret,
    Zara,
}

impl Store {
    /// All variants, in matching order. `MangoOutlet` must precede `Mango`
    /// so that an outlet URL is not claimed by the plain `Mango` substring.
    pub const ALL: [Store; 12] = [
        Store::Bershka,
        Store::Decathlon,
        Store::Fifty,
        Store::Lefties,
        Store::MangoOutlet,
        Store::Mango,
        Store::Parfois,
        Store::Springfield,
        Store::SportZone,
        Store::Stradivarius,
        Store::WomenSecret,
        Store::Zara,
    ];

    /// Canonical (pascal-case) name, as persisted in the `store` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Store::Bershka => "Bershka",
            Store::Decathlon => "Decathlon",
            Store::Fifty => "Fifty",
            Store::Lefties => "Lefties",
            Store::MangoOutlet => "MangoOutlet",
            Store::Mango => "Mango",
            Store::Parfois => "Parfois",
            Store::Springfield => "Springfield",
            Store::SportZone => "SportZone",
            Store::Stradivarius => "Stradivarius",
            Store::WomenSecret => "WomenSecret",
            Store::Zara => "Zara",
        }
    }

    /// Resolves a product URL to its store.
    ///
    /// Fatal for the registration path: a URL matching no known store is a
    /// caller error, never encountered mid-cycle since only already-registered
    /// products are re-scraped.
    pub fn for_url(url: &str) -> Result<Store, WatchError> {
        let lowered = url.to_lowercase();
        if lowered.contains("sprintersports") {
            return Ok(Store::SportZone);
        }
        Store::ALL
            .iter()
            .copied()
            .find(|store| lowered.contains(&store.as_str().to_lowercase()))
            .ok_or_else(|| WatchError::StoreNotSupported {
                url: url.to_string(),
            })
    }

    /// Parses the persisted column value back into the enum.
    pub fn parse(value: &str) -> Result<Store, WatchError> {
        Store::ALL
            .iter()
            .copied()
            .find(|store| store.as_str() == value)
            .ok_or_else(|| WatchError::StoreNotSupported {
                url: value.to_string(),
            })
    }

    /// Human-readable name for presentation ("MangoOutlet" -> "Mango outlet").
    pub fn display_name(&self) -> String {
        pascal_case_to_sentence_case(self.as_str())
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn pascal_case_to_sentence_case(value: &str) -> String {
    let mut spaced = String::with_capacity(value.len() + 4);
    for (index, ch) in value.chars().enumerate() {
        if ch.is_uppercase() && index > 0 {
            spaced.push(' ');
        }
        spaced.push(ch);
    }
    let lowered = spaced.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => lowered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_store_from_url_substring() {
        let store = Store::for_url("https://www.zara.com/es/en/p012345.html").unwrap();
        assert_eq!(store, Store::Zara);
    }

    #[test]
    fn outlet_url_resolves_to_mango_outlet_not_mango() {
        let store = Store::for_url("https://shop.mangooutlet.com/es/item").unwrap();
        assert_eq!(store, Store::MangoOutlet);
    }

    #[test]
    fn sprintersports_override_maps_to_sport_zone() {
        let store = Store::for_url("https://www.sprintersports.com/zapatillas").unwrap();
        assert_eq!(store, Store::SportZone);
    }

    #[test]
    fn unknown_store_is_a_caller_visible_error() {
        let error = Store::for_url("https://example.com/product/1").unwrap_err();
        assert!(matches!(error, WatchError::StoreNotSupported { .. }));
    }

    #[test]
    fn display_name_humanizes_pascal_case() {
        assert_eq!(Store::MangoOutlet.display_name(), "Mango outlet");
        assert_eq!(Store::WomenSecret.display_name(), "Women secret");
        assert_eq!(Store::Zara.display_name(), "Zara");
    }

    #[test]
    fn parse_round_trips_every_variant() {
        for store in Store::ALL {
            assert_eq!(Store::parse(store.as_str()).unwrap(), store);
        }
    }
}
