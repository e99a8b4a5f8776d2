//! Keyword overlap between two objects.
//!
//! The token set of an object is the union of its lower-cased keywords,
//! lower-cased labels, and lower-cased title words longer than
//! [`MIN_TITLE_WORD_CHARS`] characters. Similarity is the Jaccard index of
//! the two sets.

use std::collections::BTreeSet;

use knot_core::model::CanonicalObject;

/// Title words must be strictly longer than this to count as tokens.
pub const MIN_TITLE_WORD_CHARS: usize = 3;

/// Jaccard similarity and the shared tokens behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordOverlap {
    pub similarity: f64,
    /// Shared tokens in sorted order.
    pub shared: Vec<String>,
}

/// Build the keyword token set for one object.
#[must_use]
pub fn keyword_tokens(obj: &CanonicalObject) -> BTreeSet<String> {
    let props = &obj.properties;
    let tagged = props.keywords.iter().chain(props.labels.iter()).map(|t| t.trim());
    let title_words = obj
        .title
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_TITLE_WORD_CHARS);

    tagged
        .chain(title_words)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Generic Jaccard similarity: `|A ∩ B| / |A ∪ B|`.
///
/// Returns `0.0` if both sets are empty (to avoid 0/0).
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use knot_infer::signals::jaccard;
///
/// let a: BTreeSet<&str> = ["x", "y", "z"].into_iter().collect();
/// let b: BTreeSet<&str> = ["y", "z", "w"].into_iter().collect();
/// assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union_size = a.len() + b.len() - intersection;
    if union_size == 0 {
        0.0
    } else {
        intersection as f64 / union_size as f64
    }
}

/// Keyword overlap for a pair, or `None` when either set is empty.
#[must_use]
pub fn keyword_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<KeywordOverlap> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(KeywordOverlap {
        similarity: jaccard(a, b),
        shared: a.intersection(b).cloned().collect(),
    })
}
