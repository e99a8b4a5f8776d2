//! Cosine similarity over caller-supplied embeddings.
//!
//! Embeddings are produced upstream and handed in as an id → vector map.
//! Vectors of different lengths cannot be compared; that case is surfaced as
//! [`DimensionMismatch`] so the caller can warn, and scores `0.0`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Embedding vectors keyed by object id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingIndex {
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(id.into(), vector);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl From<HashMap<String, Vec<f32>>> for EmbeddingIndex {
    fn from(vectors: HashMap<String, Vec<f32>>) -> Self {
        Self { vectors }
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f32>)> for EmbeddingIndex {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f32>)>>(iter: I) -> Self {
        Self {
            vectors: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Two embeddings with different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("embedding dimension mismatch: {left} vs {right}")]
pub struct DimensionMismatch {
    pub left: usize,
    pub right: usize,
}

/// Cosine similarity in `[-1, 1]`.
///
/// Empty or zero-magnitude vectors score `0.0`.
///
/// # Errors
///
/// Returns [`DimensionMismatch`] when the vectors differ in length.
pub fn cosine_checked(left: &[f32], right: &[f32]) -> Result<f64, DimensionMismatch> {
    if left.len() != right.len() {
        return Err(DimensionMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut left_norm_sq = 0.0_f64;
    let mut right_norm_sq = 0.0_f64;

    for (a, b) in left.iter().zip(right.iter()) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm_sq += a * a;
        right_norm_sq += b * b;
    }

    let denom = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    // Only exact zero magnitude is degenerate; tiny norms are still valid.
    if denom <= 0.0 || !denom.is_finite() {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

/// Cosine similarity with mismatched lengths mapped to `0.0`.
#[must_use]
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    cosine_checked(left, right).unwrap_or(0.0)
}
