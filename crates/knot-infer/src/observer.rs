//! Progress and anomaly callbacks.
//!
//! Stages log through `tracing` on their own; an [`InferenceObserver`] is the
//! structured channel for callers that want to count, collect, or display
//! what happened during a run. Every method has a no-op default.

use std::fmt;

use crate::contrastive::JudgeError;
use crate::threshold::GroupSummary;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Explicit,
    Duplicates,
    Fusion,
    DocumentThreshold,
    Contrastive,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Duplicates => "duplicates",
            Self::Fusion => "fusion",
            Self::DocumentThreshold => "document_threshold",
            Self::Contrastive => "contrastive",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives events from an inference run. Implementations must be cheap;
/// they are called from inside the pair loops.
pub trait InferenceObserver: Send + Sync {
    /// A stage completed and produced `relations` edges (after filtering).
    fn stage_finished(&self, _stage: Stage, _relations: usize) {}

    /// A pair passed the fusion gate.
    fn pair_accepted(&self, _a: &str, _b: &str, _combined: f64) {}

    /// Embeddings for a pair had different lengths; the semantic signal was 0.
    fn dimension_mismatch(&self, _a: &str, _b: &str, _left: usize, _right: usize) {}

    /// A cross-project group fell below the document threshold.
    fn group_dropped(&self, _group: &GroupSummary) {}

    /// The judge failed for a pair after retries; the pair counts as unrelated.
    fn judge_failed(&self, _a: &str, _b: &str, _error: &JudgeError) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InferenceObserver for NoopObserver {}

/// Emits stage summaries and dropped groups as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl InferenceObserver for TracingObserver {
    fn stage_finished(&self, stage: Stage, relations: usize) {
        tracing::info!(stage = %stage, relations, "stage finished");
    }

    fn group_dropped(&self, group: &GroupSummary) {
        tracing::info!(
            project_a = %group.project_a,
            project_b = %group.project_b,
            relations = group.relation_count,
            avg_confidence = group.avg_confidence,
            "dropped weak cross-project group"
        );
    }
}
