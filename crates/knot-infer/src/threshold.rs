//! Document-level filtering of similarity edges by project grouping.
//!
//! Pair-level scores can pass the fusion gate by accident when two projects
//! only brush against each other. This stage groups edges by the unordered
//! pair of project tokens of their endpoints and drops every edge of a
//! cross-project group whose mean confidence or size is too low.
//!
//! - Same-project groups are always kept.
//! - Edges where either endpoint has no project token pass through untouched.
//! - Survivors keep their original relative order.

use std::collections::HashMap;

use knot_core::model::Relation;
use knot_core::model::object_id::project_key;
use serde::Serialize;

/// Aggregate for one project-pair group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub project_a: String,
    pub project_b: String,
    pub relation_count: usize,
    pub avg_confidence: f64,
    pub same_project: bool,
    pub kept: bool,
}

/// Filtered relations plus one summary per group, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub relations: Vec<Relation>,
    pub groups: Vec<GroupSummary>,
}

impl FilterOutcome {
    #[must_use]
    pub fn dropped_groups(&self) -> impl Iterator<Item = &GroupSummary> {
        self.groups.iter().filter(|g| !g.kept)
    }
}

fn group_key(rel: &Relation) -> Option<(String, String)> {
    let a = project_key(&rel.from_id)?;
    let b = project_key(&rel.to_id)?;
    Some(if a <= b { (a, b) } else { (b, a) })
}

/// Apply the document threshold to `relations`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn apply_document_threshold(
    relations: Vec<Relation>,
    threshold: f64,
    min_matches: usize,
) -> FilterOutcome {
    let keys: Vec<Option<(String, String)>> = relations.iter().map(group_key).collect();

    let mut order: Vec<(String, String)> = Vec::new();
    let mut totals: HashMap<(String, String), (f64, usize)> = HashMap::new();
    for (rel, key) in relations.iter().zip(&keys) {
        let Some(key) = key else { continue };
        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            (0.0, 0)
        });
        entry.0 += rel.confidence;
        entry.1 += 1;
    }

    let groups: Vec<GroupSummary> = order
        .into_iter()
        .map(|(project_a, project_b)| {
            let (sum, count) = totals
                .get(&(project_a.clone(), project_b.clone()))
                .copied()
                .unwrap_or((0.0, 0));
            let avg = if count == 0 { 0.0 } else { sum / count as f64 };
            let same_project = project_a == project_b;
            let kept = same_project || (avg >= threshold && count >= min_matches);
            GroupSummary {
                project_a,
                project_b,
                relation_count: count,
                avg_confidence: avg,
                same_project,
                kept,
            }
        })
        .collect();

    let dropped: Vec<(&str, &str)> = groups
        .iter()
        .filter(|g| !g.kept)
        .map(|g| (g.project_a.as_str(), g.project_b.as_str()))
        .collect();

    let relations = if dropped.is_empty() {
        relations
    } else {
        relations
            .into_iter()
            .zip(&keys)
            .filter(|(_, key)| {
                key.as_ref().is_none_or(|(a, b)| {
                    !dropped.iter().any(|(da, db)| da == a && db == b)
                })
            })
            .map(|(rel, _)| rel)
            .collect()
    };

    FilterOutcome { relations, groups }
}
