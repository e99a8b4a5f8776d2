//! Merged relation set with lookup, statistics, and graph export.

use std::collections::{BTreeMap, HashMap};

use knot_core::model::{Relation, RelationSource, RelationType};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

/// Which endpoint of an edge must match in [`RelationGraph::touching`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    /// `from_id == id`
    Outgoing,
    /// `to_id == id`
    Incoming,
    #[default]
    Both,
}

/// Aggregate counts over a relation set.
///
/// `by_type` and `by_source` each sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationStats {
    pub total: usize,
    pub by_type: BTreeMap<RelationType, usize>,
    pub by_source: BTreeMap<RelationSource, usize>,
    /// Mean confidence; `0.0` for an empty set.
    pub avg_confidence: f64,
}

/// All edges from every stage of a run, in stage order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RelationGraph {
    relations: Vec<Relation>,
}

impl RelationGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_relations(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// Concatenate several sources in the order given.
    #[must_use]
    pub fn merged<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Vec<Relation>>,
    {
        let mut graph = Self::new();
        for source in sources {
            graph.merge(source);
        }
        graph
    }

    /// Append relations from another source.
    pub fn merge(&mut self, relations: impl IntoIterator<Item = Relation>) {
        self.relations.extend(relations);
    }

    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    #[must_use]
    pub fn into_relations(self) -> Vec<Relation> {
        self.relations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relation> {
        self.relations.iter()
    }

    /// Keep only relations matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&Relation) -> bool) {
        self.relations.retain(keep);
    }

    /// Relations with `id` at the requested end.
    pub fn touching<'a>(
        &'a self,
        id: &'a str,
        direction: EdgeDirection,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |r| match direction {
            EdgeDirection::Outgoing => r.from_id == id,
            EdgeDirection::Incoming => r.to_id == id,
            EdgeDirection::Both => r.touches(id),
        })
    }

    pub fn of_type(&self, kind: RelationType) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.relation_type == kind)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> RelationStats {
        let mut stats = RelationStats {
            total: self.relations.len(),
            ..RelationStats::default()
        };
        let mut confidence_sum = 0.0;
        for rel in &self.relations {
            *stats.by_type.entry(rel.relation_type).or_insert(0) += 1;
            *stats.by_source.entry(rel.source).or_insert(0) += 1;
            confidence_sum += rel.confidence;
        }
        if stats.total > 0 {
            stats.avg_confidence = confidence_sum / stats.total as f64;
        }
        stats
    }

    /// Export as a directed graph. Nodes carry object ids (first-seen order),
    /// edges carry the relation type.
    #[must_use]
    pub fn to_digraph(&self) -> DiGraph<String, RelationType> {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for rel in &self.relations {
            let from = *nodes
                .entry(rel.from_id.as_str())
                .or_insert_with(|| graph.add_node(rel.from_id.clone()));
            let to = *nodes
                .entry(rel.to_id.as_str())
                .or_insert_with(|| graph.add_node(rel.to_id.clone()));
            graph.add_edge(from, to, rel.relation_type);
        }

        graph
    }
}

impl<'a> IntoIterator for &'a RelationGraph {
    type Item = &'a Relation;
    type IntoIter = std::slice::Iter<'a, Relation>;

    fn into_iter(self) -> Self::IntoIter {
        self.relations.iter()
    }
}

impl IntoIterator for RelationGraph {
    type Item = Relation;
    type IntoIter = std::vec::IntoIter<Relation>;

    fn into_iter(self) -> Self::IntoIter {
        self.relations.into_iter()
    }
}

impl FromIterator<Relation> for RelationGraph {
    fn from_iter<I: IntoIterator<Item = Relation>>(iter: I) -> Self {
        Self {
            relations: iter.into_iter().collect(),
        }
    }
}
