//! Size ordering and watch-size validation policy
//!
//! Sizes travel as canonical comma-joined strings: ordered, deduplicated and
//! upper-cased, with the `UNIQUE` sentinel for sizeless products. Ordering is
//! numeric when every token parses as a number (shoe sizes), otherwise driven
//! by a fixed alphabetic priority table.

use std::collections::HashSet;

use crate::domain::errors::WatchError;

/// Sentinel value used in place of a size set for sizeless products.
pub const SIZE_UNIQUE: &str = "UNIQUE";

/// Priority of an alphabetic size token. Every accepted token must be listed
/// here; an undefined token is a caller error, not silently accepted.
fn size_priority(size: &str) -> Option<u8> {
    let priority = match size {
        "XXS" => 0,
        "XS" => 1,
        "S" => 2,
        "M" => 3,
        "L" => 4,
        "XL" => 5,
        "XXL" => 6,
        "XXXL" => 7,
        _ => return None,
    };
    Some(priority)
}

/// Orders a size list into its deterministic, total order.
///
/// - A single non-empty token after filtering blanks is returned as-is
///   (covers the `UNIQUE` sentinel upstream).
/// - If every token parses as a number, sort ascending numerically.
/// - Otherwise sort by the fixed alphabetic priority table; an unknown token
///   yields [`WatchError::UnknownSize`].
pub fn order_sizes(sizes: &[String]) -> Result<Vec<String>, WatchError> {
    let filtered: Vec<&String> = sizes.iter().filter(|size| !size.is_empty()).collect();
    if filtered.len() == 1 {
        return Ok(vec![filtered[0].clone()]);
    }

    let all_numeric = !filtered.is_empty()
        && filtered
            .iter()
            .all(|size| size.parse::<f64>().map_or(false, |n| n.is_finite()));
    if all_numeric {
        let mut numeric: Vec<f64> = filtered
            .iter()
            .filter_map(|size| size.parse::<f64>().ok())
            .collect();
        numeric.sort_by(|a, b| a.total_cmp(b));
        return Ok(numeric
            .into_iter()
            .map(|size| {
                if size.fract() == 0.0 {
                    format!("{}", size as i64)
                } else {
                    format!("{size}")
                }
            })
            .collect());
    }

    let mut keyed: Vec<(u8, String)> = Vec::with_capacity(filtered.len());
    for size in filtered {
        let priority = size_priority(size).ok_or_else(|| WatchError::UnknownSize {
            size: size.clone(),
        })?;
        keyed.push((priority, size.clone()));
    }
    keyed.sort_by_key(|(priority, _)| *priority);
    Ok(keyed.into_iter().map(|(_, size)| size).collect())
}

/// Splits a canonical comma-joined size string into its tokens.
pub fn split_sizes(sizes: &str) -> Vec<String> {
    sizes
        .split(',')
        .map(|size| size.trim().to_string())
        .filter(|size| !size.is_empty())
        .collect()
}

/// Joins ordered size tokens back into the canonical string form.
pub fn canonical_join(sizes: &[String]) -> String {
    sizes.join(",")
}

/// Validates a user's requested watch sizes against a product's vocabulary.
///
/// Returns the canonical (ordered, deduplicated, upper-cased) string to
/// persist on the subscription. A sizeless product always watches `UNIQUE`.
/// Sizes absent from the product's full size set are surfaced with enough
/// detail to let the caller correct input.
pub fn validate_watch_sizes(
    all_sizes: &str,
    requested: &str,
    url: &str,
) -> Result<String, WatchError> {
    if all_sizes == SIZE_UNIQUE {
        return Ok(SIZE_UNIQUE.to_string());
    }

    let mut seen = HashSet::new();
    let tokens: Vec<String> = split_sizes(&requested.to_uppercase())
        .into_iter()
        .filter(|size| seen.insert(size.clone()))
        .collect();
    let ordered = order_sizes(&tokens)?;

    let vocabulary: HashSet<String> = split_sizes(all_sizes).into_iter().collect();
    let unavailable: Vec<String> = ordered
        .iter()
        .filter(|size| !vocabulary.contains(*size))
        .cloned()
        .collect();
    if !unavailable.is_empty() {
        return Err(WatchError::SizesNotAvailable {
            sizes: unavailable,
            url: url.to_string(),
        });
    }

    Ok(canonical_join(&ordered))
}
