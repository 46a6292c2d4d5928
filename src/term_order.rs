use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

use crate::models::FeeTerm;

static FIRST_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Rank inferred from a term name: the first run of digits, or 0 when there is none.
/// "Term 10" -> 10, "Annual" -> 0.
pub fn name_rank(name: &str) -> i64 {
    FIRST_DIGITS
        .find(name)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Pairwise payment-order comparison: explicit `order` when both terms have
/// one, otherwise the integers embedded in their names.
pub fn compare_terms(a: &FeeTerm, b: &FeeTerm) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => name_rank(&a.name).cmp(&name_rank(&b.name)),
    }
}

/// Sorts fee terms into payment order using [`compare_terms`].
///
/// The comparison is not transitive when only some terms carry `order`, which
/// `slice::sort_by` may reject with a panic. A stable insertion sort gives a
/// deterministic result for any input and keeps ties in their original
/// relative position. Term lists are a handful of entries long.
pub fn resolve_order(terms: &[FeeTerm]) -> Vec<FeeTerm> {
    let mut sorted = terms.to_vec();
    for i in 1..sorted.len() {
        let mut j = i;
        while j > 0 && compare_terms(&sorted[j - 1], &sorted[j]) == Ordering::Greater {
            sorted.swap(j - 1, j);
            j -= 1;
        }
    }
    sorted
}
