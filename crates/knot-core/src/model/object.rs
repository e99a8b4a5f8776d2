use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized record from any source platform (issue, ticket, message).
///
/// Produced by the upstream ingestion pipeline and treated as read-only by
/// every inference stage. All fields other than `id` default so sparse
/// records deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalObject {
    /// Globally unique id, conventionally `{platform}-{project...}-{number}`.
    pub id: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub actors: Actors,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub relations: ObjectRelations,
    /// Content fingerprint used for exact-duplicate grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_hash: Option<String>,
}

/// People attached to an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub assignees: Vec<String>,
    pub participants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Free-form properties. Known keys are typed; anything else is kept in
/// `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub keywords: Vec<String>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Structural links recorded by the source platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectRelations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub linked_issues: Vec<String>,
    pub linked_prs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by_ticket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resulted_in_issue: Option<String>,
}

impl CanonicalObject {
    /// Create an object with only an id; every other field is defaulted.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform: String::new(),
            object_type: String::new(),
            title: String::new(),
            body: String::new(),
            actors: Actors::default(),
            timestamps: Timestamps::default(),
            properties: Properties::default(),
            relations: ObjectRelations::default(),
            semantic_hash: None,
        }
    }

    /// Text shown to a relatedness judge: the title, or the id when the
    /// title is blank.
    #[must_use]
    pub fn display_text(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() { &self.id } else { title }
    }

    /// BLAKE3 hex digest of the normalized title and body.
    ///
    /// Whitespace runs collapse to a single space and text is lower-cased, so
    /// records that differ only in formatting share a fingerprint.
    #[must_use]
    pub fn content_fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(normalize_for_fingerprint(&self.title).as_bytes());
        hasher.update(b"\n");
        hasher.update(normalize_for_fingerprint(&self.body).as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// The semantic hash, ignoring blank values.
    #[must_use]
    pub fn semantic_hash(&self) -> Option<&str> {
        non_blank(self.semantic_hash.as_deref())
    }

    /// Every id this object links to through `linked_issues` or `linked_prs`.
    pub fn linked_ids(&self) -> impl Iterator<Item = &str> {
        self.relations
            .linked_issues
            .iter()
            .chain(self.relations.linked_prs.iter())
            .map(String::as_str)
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        non_blank(self.relations.parent_id.as_deref())
    }

    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        non_blank(self.actors.created_by.as_deref())
    }
}

/// Treat empty and whitespace-only strings as absent.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_for_fingerprint(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
