//! Edges read straight off structural fields.
//!
//! Each object contributes confidence-1.0 `explicit` edges for every populated
//! field. Blank strings count as missing. `decided_by` and `participated_in`
//! point from the person to the object; everything else points away from the
//! object.

use knot_core::model::object::non_blank;
use knot_core::model::{CanonicalObject, Relation, RelationType};

/// Extract explicit edges for every object, preserving input order.
#[must_use]
pub fn extract_explicit(objects: &[CanonicalObject]) -> Vec<Relation> {
    let mut out = Vec::new();
    for obj in objects {
        extract_one(obj, &mut out);
    }
    tracing::debug!(objects = objects.len(), relations = out.len(), "explicit extraction done");
    out
}

fn extract_one(obj: &CanonicalObject, out: &mut Vec<Relation>) {
    let id = obj.id.as_str();
    let rels = &obj.relations;
    let actors = &obj.actors;

    if let Some(ticket) = non_blank(rels.triggered_by_ticket.as_deref()) {
        out.push(Relation::explicit(
            id,
            ticket,
            RelationType::TriggeredBy,
            "relations.triggered_by_ticket",
        ));
    }

    if let Some(issue) = non_blank(rels.resulted_in_issue.as_deref()) {
        out.push(Relation::explicit(
            id,
            issue,
            RelationType::ResultedIn,
            "relations.resulted_in_issue",
        ));
    }

    if let Some(creator) = obj.created_by() {
        out.push(Relation::explicit(
            id,
            creator,
            RelationType::CreatedBy,
            "actors.created_by",
        ));
    }

    for assignee in actors.assignees.iter().filter(|a| !a.trim().is_empty()) {
        out.push(Relation::explicit(
            id,
            assignee.as_str(),
            RelationType::AssignedTo,
            "actors.assignees",
        ));
    }

    if let Some(decider) = non_blank(actors.decided_by.as_deref()) {
        out.push(Relation::explicit(
            decider,
            id,
            RelationType::DecidedBy,
            "actors.decided_by",
        ));
    }

    for participant in actors.participants.iter().filter(|p| !p.trim().is_empty()) {
        out.push(Relation::explicit(
            participant.as_str(),
            id,
            RelationType::ParticipatedIn,
            "actors.participants",
        ));
    }

    for link in rels.linked_prs.iter().filter(|l| !l.trim().is_empty()) {
        out.push(Relation::explicit(
            id,
            link.as_str(),
            RelationType::RelatedTo,
            "relations.linked_prs",
        ));
    }

    for link in rels.linked_issues.iter().filter(|l| !l.trim().is_empty()) {
        out.push(Relation::explicit(
            id,
            link.as_str(),
            RelationType::RelatedTo,
            "relations.linked_issues",
        ));
    }

    if let Some(parent) = obj.parent_id() {
        out.push(Relation::explicit(
            id,
            parent,
            RelationType::BelongsTo,
            "relations.parent_id",
        ));
    }
}
