//! Renormalized signal weights per fusion branch.
//!
//! The branch is picked from which signals are active for a pair. Weights in
//! every branch sum to `1.0`, so fusing scores in `[0, 1]` stays in `[0, 1]`.

use std::fmt;

use knot_core::config::InferenceConfig;
use serde::Serialize;

/// Which signals were combined for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionBranch {
    KeywordOnly,
    SemanticKeyword,
    SemanticKeywordProject,
    SemanticKeywordSchema,
    SemanticKeywordProjectSchema,
}

impl FusionBranch {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeywordOnly => "keyword",
            Self::SemanticKeyword => "semantic+keyword",
            Self::SemanticKeywordProject => "semantic+keyword+project",
            Self::SemanticKeywordSchema => "semantic+keyword+schema",
            Self::SemanticKeywordProjectSchema => "semantic+keyword+project+schema",
        }
    }

    #[must_use]
    pub const fn uses_semantic(self) -> bool {
        !matches!(self, Self::KeywordOnly)
    }

    #[must_use]
    pub const fn uses_project(self) -> bool {
        matches!(
            self,
            Self::SemanticKeywordProject | Self::SemanticKeywordProjectSchema
        )
    }

    #[must_use]
    pub const fn uses_schema(self) -> bool {
        matches!(
            self,
            Self::SemanticKeywordSchema | Self::SemanticKeywordProjectSchema
        )
    }
}

impl fmt::Display for FusionBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-signal scores for one pair, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalScores {
    pub keyword: f64,
    /// Cosine already clamped to be non-negative.
    pub semantic: f64,
    pub project: f64,
    pub schema: f64,
}

/// Effective weight of each signal in one branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub semantic: f64,
    pub keyword: f64,
    pub project: f64,
    pub schema: f64,
    pub branch: FusionBranch,
}

impl FusionWeights {
    /// Weights for a pair given whether embeddings exist for both sides.
    ///
    /// Without embeddings the keyword score is used as-is; project and schema
    /// only take part in the semantic branches.
    #[must_use]
    pub fn for_signals(config: &InferenceConfig, semantic_available: bool) -> Self {
        if !semantic_available {
            return Self {
                semantic: 0.0,
                keyword: 1.0,
                project: 0.0,
                schema: 0.0,
                branch: FusionBranch::KeywordOnly,
            };
        }

        let project = if config.use_project_metadata {
            config.project_weight
        } else {
            0.0
        };
        let schema = if config.use_schema_signal {
            config.schema_weight
        } else {
            0.0
        };
        let branch = match (config.use_project_metadata, config.use_schema_signal) {
            (true, true) => FusionBranch::SemanticKeywordProjectSchema,
            (true, false) => FusionBranch::SemanticKeywordProject,
            (false, true) => FusionBranch::SemanticKeywordSchema,
            (false, false) => FusionBranch::SemanticKeyword,
        };

        let base = (1.0 - (project + schema)).max(0.0);
        Self {
            semantic: config.semantic_weight * base,
            keyword: (1.0 - config.semantic_weight) * base,
            project,
            schema,
            branch,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.semantic + self.keyword + self.project + self.schema
    }

    /// Weighted sum of `scores`, clamped to `[0, 1]`.
    #[must_use]
    pub fn combine(&self, scores: &SignalScores) -> f64 {
        let combined = self.semantic * scores.semantic
            + self.keyword * scores.keyword
            + self.project * scores.project
            + self.schema * scores.schema;
        if combined.is_finite() {
            combined.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
