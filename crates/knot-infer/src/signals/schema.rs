//! Structural overlap from actors and links.
//!
//! Six sub-signals are checked. A sub-signal is *applicable* when both
//! objects carry the field it needs; link and parent signals only count when
//! they fire. The score is the sum of fired contributions divided by the
//! number of applicable signals, capped at `1.0`.

use std::collections::HashSet;
use std::fmt;

use knot_core::model::CanonicalObject;

/// Named sub-signals of the schema score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaSignal {
    SharedAssignee,
    SameCreator,
    SharedParticipants,
    DirectLink,
    ParentChild,
    SharedParent,
}

impl SchemaSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SharedAssignee => "shared_assignee",
            Self::SameCreator => "same_creator",
            Self::SharedParticipants => "shared_participants",
            Self::DirectLink => "direct_link",
            Self::ParentChild => "parent_child",
            Self::SharedParent => "shared_parent",
        }
    }
}

impl fmt::Display for SchemaSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SHARED_ASSIGNEE: f64 = 1.0;
const SAME_CREATOR: f64 = 0.7;
const SHARED_PARTICIPANTS: f64 = 0.5;
const DIRECT_LINK: f64 = 1.0;
const PARENT_CHILD: f64 = 1.0;
const SHARED_PARENT: f64 = 0.8;

/// Schema score with its breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaScore {
    pub score: f64,
    /// Number of sub-signals that applied to this pair.
    pub applicable: usize,
    /// Sub-signals that contributed a non-zero amount.
    pub fired: Vec<SchemaSignal>,
}

impl SchemaScore {
    const fn empty() -> Self {
        Self {
            score: 0.0,
            applicable: 0,
            fired: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Tally {
    sum: f64,
    applicable: usize,
    fired: Vec<SchemaSignal>,
}

impl Tally {
    fn apply(&mut self, signal: SchemaSignal, contribution: f64) {
        self.applicable += 1;
        if contribution > 0.0 {
            self.sum += contribution;
            self.fired.push(signal);
        }
    }
}

fn people(list: &[String]) -> HashSet<&str> {
    list.iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect()
}

fn links_to(from: &CanonicalObject, target: &str) -> bool {
    from.linked_ids().any(|id| id == target)
}

/// Score structural overlap between two objects.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn schema_similarity(a: &CanonicalObject, b: &CanonicalObject) -> SchemaScore {
    let mut tally = Tally::default();

    let assignees_a = people(&a.actors.assignees);
    let assignees_b = people(&b.actors.assignees);
    if !assignees_a.is_empty() && !assignees_b.is_empty() {
        let shared = !assignees_a.is_disjoint(&assignees_b);
        tally.apply(
            SchemaSignal::SharedAssignee,
            if shared { SHARED_ASSIGNEE } else { 0.0 },
        );
    }

    if let (Some(ca), Some(cb)) = (a.created_by(), b.created_by()) {
        tally.apply(
            SchemaSignal::SameCreator,
            if ca.trim() == cb.trim() { SAME_CREATOR } else { 0.0 },
        );
    }

    let participants_a = people(&a.actors.participants);
    let participants_b = people(&b.actors.participants);
    if !participants_a.is_empty() && !participants_b.is_empty() {
        let shared = participants_a.intersection(&participants_b).count();
        let smaller = participants_a.len().min(participants_b.len());
        tally.apply(
            SchemaSignal::SharedParticipants,
            SHARED_PARTICIPANTS * (shared as f64 / smaller as f64),
        );
    }

    if links_to(a, &b.id) || links_to(b, &a.id) {
        tally.apply(SchemaSignal::DirectLink, DIRECT_LINK);
    }

    if a.parent_id() == Some(b.id.as_str()) || b.parent_id() == Some(a.id.as_str()) {
        tally.apply(SchemaSignal::ParentChild, PARENT_CHILD);
    }

    if let (Some(pa), Some(pb)) = (a.parent_id(), b.parent_id()) {
        if pa == pb {
            tally.apply(SchemaSignal::SharedParent, SHARED_PARENT);
        }
    }

    if tally.applicable == 0 {
        return SchemaScore::empty();
    }

    SchemaScore {
        score: (tally.sum / tally.applicable as f64).min(1.0),
        applicable: tally.applicable,
        fired: tally.fired,
    }
}
