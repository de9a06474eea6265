//! Money conversion between integer minor units and decimal display units
//!
//! Prices are stored and compared as integer cents to avoid floating-point
//! drift; conversion to decimal units happens only at presentation
//! boundaries.

/// Converts decimal units to integer cents, rounding to the nearest integer.
pub fn to_cents(units: f64) -> i64 {
    (units * 100.0).round() as i64
}

/// Converts integer cents to decimal units.
pub fn to_units(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Formats a minor-unit price for presentation, e.g. `1999` EUR -> "€19.99".
///
/// Zero prices render as an empty string (an unscraped or free price is not
/// worth presenting), matching the behavior watchers see in their e-mails.
pub fn format_price(cents: i64, currency: &str) -> String {
    if cents == 0 {
        return String::new();
    }
    let units = to_units(cents);
    match currency_symbol(currency) {
        Some(symbol) => format!("{symbol}{units:.2}"),
        None => format!("{units:.2} {currency}"),
    }
}

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency {
        "EUR" => Some("€"),
        "USD" => Some("$"),
        "GBP" => Some("£"),
        _ => None,
    }
}
