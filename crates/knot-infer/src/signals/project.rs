//! Same-project signal derived from the id convention.

use knot_core::model::object_id::same_project;

/// `1.0` when both ids carry the same project token, else `0.0`.
#[must_use]
pub fn project_similarity(a_id: &str, b_id: &str) -> f64 {
    if same_project(a_id, b_id) { 1.0 } else { 0.0 }
}
