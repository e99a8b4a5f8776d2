//! Exact-duplicate grouping by content hash.
//!
//! Objects sharing a non-blank `semantic_hash` form a group. One member is
//! chosen as canonical per [`CanonicalRule`] and every other member gets a
//! `duplicate_of` edge pointing at it. Objects without a hash never appear in
//! the output.

use std::collections::HashMap;

use knot_core::config::CanonicalRule;
use knot_core::model::{CanonicalObject, Relation, RelationMetadata, RelationSource, RelationType};

/// One group of objects sharing a content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub content_hash: String,
    pub canonical_id: String,
    /// All members in input order, canonical included.
    pub member_ids: Vec<String>,
}

impl DuplicateGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// Group objects by hash, keeping only groups with more than one member.
///
/// Groups are returned in order of first appearance of their hash.
#[must_use]
pub fn group_duplicates(objects: &[CanonicalObject], rule: CanonicalRule) -> Vec<DuplicateGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<&CanonicalObject>> = HashMap::new();

    for obj in objects {
        let Some(hash) = obj.semantic_hash() else {
            continue;
        };
        let bucket = buckets.entry(hash).or_default();
        if bucket.is_empty() {
            order.push(hash);
        }
        bucket.push(obj);
    }

    order
        .into_iter()
        .filter_map(|hash| {
            let members = buckets.remove(hash)?;
            if members.len() < 2 {
                return None;
            }
            let canonical = pick_canonical(&members, rule)?;
            Some(DuplicateGroup {
                content_hash: hash.to_string(),
                canonical_id: canonical.id.clone(),
                member_ids: members.iter().map(|m| m.id.clone()).collect(),
            })
        })
        .collect()
}

fn pick_canonical<'a>(
    members: &[&'a CanonicalObject],
    rule: CanonicalRule,
) -> Option<&'a CanonicalObject> {
    match rule {
        CanonicalRule::FirstSeen => members.first().copied(),
        CanonicalRule::EarliestCreated => members
            .iter()
            .copied()
            .min_by(|a, b| {
                a.timestamps
                    .created_at
                    .cmp(&b.timestamps.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        CanonicalRule::SmallestId => members.iter().copied().min_by(|a, b| a.id.cmp(&b.id)),
    }
}

/// Emit `duplicate_of` edges from every non-canonical member to its canonical.
#[must_use]
pub fn detect_duplicates(objects: &[CanonicalObject], rule: CanonicalRule) -> Vec<Relation> {
    let groups = group_duplicates(objects, rule);
    let mut out = Vec::new();

    for group in &groups {
        for member in &group.member_ids {
            // Repeated ids inside one group would otherwise self-loop.
            if *member == group.canonical_id {
                continue;
            }
            let metadata = RelationMetadata {
                content_hash: Some(group.content_hash.clone()),
                group_size: Some(group.len()),
                evidence: vec!["semantic_hash".to_string()],
                ..RelationMetadata::default()
            };
            out.push(
                Relation::new(
                    member.as_str(),
                    group.canonical_id.as_str(),
                    RelationType::DuplicateOf,
                    RelationSource::Computed,
                    1.0,
                )
                .with_metadata(metadata),
            );
        }
    }

    tracing::debug!(groups = groups.len(), relations = out.len(), "duplicate detection done");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn obj(id: &str, hash: Option<&str>, created_secs: i64) -> CanonicalObject {
        let mut o = CanonicalObject::new(id);
        o.semantic_hash = hash.map(str::to_string);
        o.timestamps.created_at = Utc
            .timestamp_opt(created_secs, 0)
            .single()
            .expect("valid timestamp");
        o
    }

    #[test]
    fn group_of_three_yields_two_edges() {
        let objects = vec![
            obj("o3", Some("h1"), 10),
            obj("o4", Some("h1"), 20),
            obj("o5", Some("h1"), 30),
            obj("o6", Some("h2"), 5),
        ];
        let rels = detect_duplicates(&objects, CanonicalRule::EarliestCreated);
        assert_eq!(rels.len(), 2);
        assert!(rels.iter().all(|r| r.to_id == "o3"));
        assert!(rels.iter().all(|r| !r.touches("o6")));
        assert_eq!(rels[0].metadata.group_size, Some(3));
        assert_eq!(rels[0].metadata.content_hash.as_deref(), Some("h1"));
        assert_eq!(rels[0].source, RelationSource::Computed);
    }

    #[test]
    fn objects_without_hash_are_ignored() {
        let objects = vec![obj("a", None, 0), obj("b", None, 0), obj("c", Some(" "), 0)];
        assert!(group_duplicates(&objects, CanonicalRule::FirstSeen).is_empty());
    }

    #[test]
    fn canonical_rules_differ() {
        let objects = vec![
            obj("m", Some("h"), 30),
            obj("z", Some("h"), 10),
            obj("a", Some("h"), 20),
        ];
        let first = group_duplicates(&objects, CanonicalRule::FirstSeen);
        let earliest = group_duplicates(&objects, CanonicalRule::EarliestCreated);
        let smallest = group_duplicates(&objects, CanonicalRule::SmallestId);
        assert_eq!(first[0].canonical_id, "m");
        assert_eq!(earliest[0].canonical_id, "z");
        assert_eq!(smallest[0].canonical_id, "a");
    }

    #[test]
    fn earliest_created_ties_break_on_id() {
        let objects = vec![obj("q", Some("h"), 5), obj("b", Some("h"), 5)];
        let groups = group_duplicates(&objects, CanonicalRule::EarliestCreated);
        assert_eq!(groups[0].canonical_id, "b");
    }

    #[test]
    fn groups_follow_first_appearance() {
        let objects = vec![
            obj("a", Some("h2"), 0),
            obj("b", Some("h1"), 0),
            obj("c", Some("h1"), 0),
            obj("d", Some("h2"), 0),
        ];
        let groups = group_duplicates(&objects, CanonicalRule::FirstSeen);
        let hashes: Vec<_> = groups.iter().map(|g| g.content_hash.as_str()).collect();
        assert_eq!(hashes, vec!["h2", "h1"]);
        assert_eq!(groups[0].member_ids, vec!["a".to_string(), "d".to_string()]);
    }

    #[test]
    fn repeated_id_does_not_self_loop() {
        let objects = vec![obj("a", Some("h"), 0), obj("a", Some("h"), 0)];
        assert!(detect_duplicates(&objects, CanonicalRule::FirstSeen).is_empty());
    }
}
