use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The ten edge kinds the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    TriggeredBy,
    ResultedIn,
    BelongsTo,
    AssignedTo,
    CreatedBy,
    DecidedBy,
    ParticipatedIn,
    SimilarTo,
    DuplicateOf,
    RelatedTo,
}

impl RelationType {
    pub const ALL: [Self; 10] = [
        Self::TriggeredBy,
        Self::ResultedIn,
        Self::BelongsTo,
        Self::AssignedTo,
        Self::CreatedBy,
        Self::DecidedBy,
        Self::ParticipatedIn,
        Self::SimilarTo,
        Self::DuplicateOf,
        Self::RelatedTo,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TriggeredBy => "triggered_by",
            Self::ResultedIn => "resulted_in",
            Self::BelongsTo => "belongs_to",
            Self::AssignedTo => "assigned_to",
            Self::CreatedBy => "created_by",
            Self::DecidedBy => "decided_by",
            Self::ParticipatedIn => "participated_in",
            Self::SimilarTo => "similar_to",
            Self::DuplicateOf => "duplicate_of",
            Self::RelatedTo => "related_to",
        }
    }

    /// Kinds that are always stored as a mirrored pair.
    #[must_use]
    pub const fn is_symmetric(self) -> bool {
        matches!(self, Self::SimilarTo)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or_else(|| ParseEnumError {
                expected: "relation type",
                got: s.to_string(),
            })
    }
}

/// Where an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationSource {
    /// Directly present in the source data.
    Explicit,
    /// Judged by a language model.
    Inferred,
    /// Derived by scoring.
    Computed,
}

impl RelationSource {
    pub const ALL: [Self; 3] = [Self::Explicit, Self::Inferred, Self::Computed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Inferred => "inferred",
            Self::Computed => "computed",
        }
    }
}

impl fmt::Display for RelationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal breakdown and evidence attached to an edge.
///
/// Every key is optional; each stage fills the keys it knows about and the
/// rest are omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_similarity: Option<f64>,
    /// Gate the combined score was compared against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Which set of signals was fused (e.g. `"semantic+keyword+schema"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fusion_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_size: Option<usize>,
    /// Source fields or reasons that justify the edge.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    /// Producing method for edges that are not plain scoring output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl RelationMetadata {
    #[must_use]
    pub fn with_evidence(evidence: impl Into<String>) -> Self {
        Self {
            evidence: vec![evidence.into()],
            ..Self::default()
        }
    }
}

/// A typed, directed, confidence-scored edge between two objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub source: RelationSource,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub metadata: RelationMetadata,
    pub created_at: DateTime<Utc>,
}

impl Relation {
    /// Build an edge stamped with the current time. `confidence` is clamped
    /// to `[0, 1]`; non-finite values become `0.0`.
    #[must_use]
    pub fn new(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        relation_type: RelationType,
        source: RelationSource,
        confidence: f64,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            relation_type,
            source,
            confidence: clamp_confidence(confidence),
            metadata: RelationMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Confidence-1.0 edge read straight from a source field.
    #[must_use]
    pub fn explicit(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        relation_type: RelationType,
        evidence: &str,
    ) -> Self {
        Self::new(from_id, to_id, relation_type, RelationSource::Explicit, 1.0)
            .with_metadata(RelationMetadata::with_evidence(evidence))
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: RelationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The same edge pointing the other way. Confidence, metadata and
    /// timestamp are carried over unchanged.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            from_id: self.to_id.clone(),
            to_id: self.from_id.clone(),
            ..self.clone()
        }
    }

    /// Forward edge followed by its mirror.
    #[must_use]
    pub fn mirrored_pair(forward: Self) -> [Self; 2] {
        let back = forward.reversed();
        [forward, back]
    }

    /// `true` if either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &str) -> bool {
        self.from_id == id || self.to_id == id
    }
}

/// Clamp to `[0, 1]`, mapping NaN and infinities to `0.0`.
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let hi = Relation::new("a", "b", RelationType::SimilarTo, RelationSource::Computed, 1.7);
        let lo = Relation::new("a", "b", RelationType::SimilarTo, RelationSource::Computed, -0.2);
        let nan = Relation::new(
            "a",
            "b",
            RelationType::SimilarTo,
            RelationSource::Computed,
            f64::NAN,
        );
        assert!((hi.confidence - 1.0).abs() < f64::EPSILON);
        assert!(lo.confidence.abs() < f64::EPSILON);
        assert!(nan.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn mirrored_pair_keeps_everything_but_direction() {
        let forward = Relation::new("a", "b", RelationType::SimilarTo, RelationSource::Computed, 0.7)
            .with_metadata(RelationMetadata {
                shared_keywords: vec!["auth".into()],
                ..RelationMetadata::default()
            });
        let [fwd, back] = Relation::mirrored_pair(forward);
        assert_eq!(fwd.from_id, "a");
        assert_eq!(back.from_id, "b");
        assert_eq!(back.to_id, "a");
        assert_eq!(fwd.metadata, back.metadata);
        assert_eq!(fwd.created_at, back.created_at);
        assert!((fwd.confidence - back.confidence).abs() < f64::EPSILON);
    }

    #[test]
    fn relation_type_round_trips_through_str() {
        for kind in RelationType::ALL {
            assert_eq!(kind.as_str().parse::<RelationType>(), Ok(kind));
        }
        assert_eq!("similar-to".parse::<RelationType>(), Ok(RelationType::SimilarTo));
        assert!("sibling_of".parse::<RelationType>().is_err());
    }

    #[test]
    fn relation_serializes_type_key_and_omits_empty_metadata() {
        let rel = Relation::explicit("a", "b", RelationType::BelongsTo, "relations.parent_id");
        let json = serde_json::to_value(&rel).expect("serialize");
        assert_eq!(json["type"], "belongs_to");
        assert_eq!(json["source"], "explicit");
        assert_eq!(json["metadata"]["evidence"][0], "relations.parent_id");
        assert!(json["metadata"].get("shared_keywords").is_none());
    }

    #[test]
    fn only_similar_to_is_symmetric() {
        let symmetric: Vec<_> = RelationType::ALL
            .into_iter()
            .filter(|k| k.is_symmetric())
            .collect();
        assert_eq!(symmetric, vec![RelationType::SimilarTo]);
    }
}
