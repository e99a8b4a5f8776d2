//! Pairwise scoring loop.
//!
//! For every unordered pair the engine gathers the active signals, fuses them
//! with [`FusionWeights`], and gates the result:
//!
//! | Embeddings for both? | Branch              | Gate                        |
//! |----------------------|---------------------|-----------------------------|
//! | no (or disabled)     | keyword             | `keyword_overlap_threshold` |
//! | yes                  | semantic+keyword(…) | `similarity_threshold`      |
//!
//! Keyword-only pairs where either token set is empty are skipped outright;
//! in the semantic branches an empty set just scores keyword overlap as 0.
//! Accepted pairs become a mirrored pair of `similar_to` edges.

use std::collections::BTreeSet;

use knot_core::cancel::{CancellationToken, Cancelled};
use knot_core::config::InferenceConfig;
use knot_core::model::{CanonicalObject, Relation, RelationMetadata, RelationSource, RelationType};

use crate::fusion::weights::{FusionWeights, SignalScores};
use crate::observer::InferenceObserver;
use crate::pairs::scan_pairs;
use crate::signals::{
    EmbeddingIndex, SchemaSignal, cosine_checked, keyword_overlap, keyword_tokens,
    project_similarity, schema_similarity,
};

/// Full scoring breakdown for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub combined: f64,
    /// Gate the combined score was compared against.
    pub threshold: f64,
    pub weights: FusionWeights,
    pub scores: SignalScores,
    /// Cosine before clamping negatives, when the semantic branch ran.
    pub raw_semantic: Option<f64>,
    pub shared_keywords: Vec<String>,
    pub schema_fired: Vec<SchemaSignal>,
}

impl PairScore {
    #[must_use]
    pub fn passes(&self) -> bool {
        self.combined >= self.threshold
    }

    /// Metadata recorded on both edges of an accepted pair.
    #[must_use]
    pub fn metadata(&self) -> RelationMetadata {
        let branch = self.weights.branch;
        RelationMetadata {
            shared_keywords: self.shared_keywords.clone(),
            keyword_similarity: Some(self.scores.keyword),
            semantic_similarity: self.raw_semantic,
            project_similarity: branch.uses_project().then_some(self.scores.project),
            schema_similarity: branch.uses_schema().then_some(self.scores.schema),
            combined_similarity: Some(self.combined),
            threshold: Some(self.threshold),
            fusion_branch: Some(branch.as_str().to_string()),
            evidence: self
                .schema_fired
                .iter()
                .map(|s| format!("schema:{s}"))
                .collect(),
            ..RelationMetadata::default()
        }
    }
}

/// Scores pairs under one configuration.
pub struct FusionEngine<'a> {
    config: &'a InferenceConfig,
    observer: &'a dyn InferenceObserver,
}

impl<'a> FusionEngine<'a> {
    #[must_use]
    pub const fn new(config: &'a InferenceConfig, observer: &'a dyn InferenceObserver) -> Self {
        Self { config, observer }
    }

    /// Score one pair. `None` means the pair has nothing to compare.
    #[must_use]
    pub fn score_pair(
        &self,
        a: &CanonicalObject,
        b: &CanonicalObject,
        tokens_a: &BTreeSet<String>,
        tokens_b: &BTreeSet<String>,
        embeddings: Option<&EmbeddingIndex>,
    ) -> Option<PairScore> {
        let cfg = self.config;
        let vectors = if cfg.use_semantic_similarity {
            embeddings.and_then(|index| Some((index.get(&a.id)?, index.get(&b.id)?)))
        } else {
            None
        };

        let overlap = keyword_overlap(tokens_a, tokens_b);

        let Some((va, vb)) = vectors else {
            let overlap = overlap?;
            return Some(PairScore {
                combined: overlap.similarity,
                threshold: cfg.keyword_overlap_threshold,
                weights: FusionWeights::for_signals(cfg, false),
                scores: SignalScores {
                    keyword: overlap.similarity,
                    ..SignalScores::default()
                },
                raw_semantic: None,
                shared_keywords: overlap.shared,
                schema_fired: Vec::new(),
            });
        };

        let raw = match cosine_checked(va, vb) {
            Ok(cosine) => cosine,
            Err(mismatch) => {
                tracing::warn!(
                    a = %a.id,
                    b = %b.id,
                    left = mismatch.left,
                    right = mismatch.right,
                    "embedding dimension mismatch, scoring semantic signal as 0"
                );
                self.observer
                    .dimension_mismatch(&a.id, &b.id, mismatch.left, mismatch.right);
                0.0
            }
        };

        let weights = FusionWeights::for_signals(cfg, true);
        let (keyword, shared_keywords) =
            overlap.map_or((0.0, Vec::new()), |o| (o.similarity, o.shared));
        let project = if weights.branch.uses_project() {
            project_similarity(&a.id, &b.id)
        } else {
            0.0
        };
        let (schema, schema_fired) = if weights.branch.uses_schema() {
            let s = schema_similarity(a, b);
            (s.score, s.fired)
        } else {
            (0.0, Vec::new())
        };

        let scores = SignalScores {
            keyword,
            semantic: raw.max(0.0),
            project,
            schema,
        };

        Some(PairScore {
            combined: weights.combine(&scores),
            threshold: cfg.similarity_threshold,
            weights,
            scores,
            raw_semantic: Some(raw),
            shared_keywords,
            schema_fired,
        })
    }

    /// Score every pair and emit mirrored `similar_to` edges for those that pass.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `cancel` fires; partial output is discarded.
    pub fn run(
        &self,
        objects: &[CanonicalObject],
        embeddings: Option<&EmbeddingIndex>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Relation>, Cancelled> {
        let tokens: Vec<BTreeSet<String>> = objects.iter().map(keyword_tokens).collect();
        let mut out = Vec::new();
        let mut scored = 0_usize;

        scan_pairs(objects.len(), cancel, |i, j| {
            let (a, b) = (&objects[i], &objects[j]);
            if a.id == b.id {
                return;
            }
            let Some(score) = self.score_pair(a, b, &tokens[i], &tokens[j], embeddings) else {
                return;
            };
            scored += 1;
            if !score.passes() {
                return;
            }

            tracing::debug!(
                a = %a.id,
                b = %b.id,
                combined = score.combined,
                branch = %score.weights.branch,
                "pair accepted"
            );
            self.observer.pair_accepted(&a.id, &b.id, score.combined);

            let forward = Relation::new(
                a.id.as_str(),
                b.id.as_str(),
                RelationType::SimilarTo,
                RelationSource::Computed,
                score.combined,
            )
            .with_metadata(score.metadata());
            out.extend(Relation::mirrored_pair(forward));
        })?;

        tracing::debug!(pairs = scored, relations = out.len(), "fusion scoring done");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;

    fn tagged(id: &str, keywords: &[&str]) -> CanonicalObject {
        let mut obj = CanonicalObject::new(id);
        obj.properties.keywords = keywords.iter().map(|k| (*k).to_string()).collect();
        obj
    }

    fn run(config: &InferenceConfig, objects: &[CanonicalObject], index: Option<&EmbeddingIndex>) -> Vec<Relation> {
        FusionEngine::new(config, &NoopObserver)
            .run(objects, index, &CancellationToken::new())
            .expect("not cancelled")
    }

    #[test]
    fn keyword_pair_above_threshold_emits_mirrored_edges() {
        let config = InferenceConfig {
            keyword_overlap_threshold: 0.5,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["a", "b", "c"]), tagged("o2", &["b", "c", "d"])];
        let rels = run(&config, &objects, None);
        assert_eq!(rels.len(), 2);
        assert_eq!((rels[0].from_id.as_str(), rels[0].to_id.as_str()), ("o1", "o2"));
        assert_eq!((rels[1].from_id.as_str(), rels[1].to_id.as_str()), ("o2", "o1"));
        assert!((rels[0].confidence - 0.5).abs() < 1e-12);
        assert_eq!(rels[0].metadata, rels[1].metadata);
        assert_eq!(rels[0].metadata.fusion_branch.as_deref(), Some("keyword"));
        assert_eq!(rels[0].metadata.shared_keywords, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn keyword_pair_below_threshold_is_dropped() {
        let objects = [tagged("o1", &["a", "b", "c"]), tagged("o2", &["b", "c", "d"])];
        assert!(run(&InferenceConfig::default(), &objects, None).is_empty());
    }

    #[test]
    fn empty_token_set_skips_keyword_pair() {
        let config = InferenceConfig {
            keyword_overlap_threshold: 0.0,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["a"]), tagged("o2", &[])];
        assert!(run(&config, &objects, None).is_empty());
    }

    #[test]
    fn semantic_branch_uses_similarity_threshold() {
        let config = InferenceConfig {
            use_semantic_similarity: true,
            similarity_threshold: 0.7,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["x"]), tagged("o2", &["y"])];
        let index: EmbeddingIndex = [("o1", vec![1.0, 0.0]), ("o2", vec![1.0, 0.0])]
            .into_iter()
            .collect();
        let rels = run(&config, &objects, Some(&index));
        assert_eq!(rels.len(), 2);
        // 0.7 * 1.0 + 0.3 * 0.0
        assert!((rels[0].confidence - 0.7).abs() < 1e-9);
        assert_eq!(rels[0].metadata.threshold, Some(0.7));
        assert_eq!(rels[0].metadata.fusion_branch.as_deref(), Some("semantic+keyword"));
    }

    #[test]
    fn negative_cosine_is_clamped_but_recorded() {
        let config = InferenceConfig {
            use_semantic_similarity: true,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["a"]), tagged("o2", &["a"])];
        let index: EmbeddingIndex = [("o1", vec![1.0, 0.0]), ("o2", vec![-1.0, 0.0])]
            .into_iter()
            .collect();
        let engine = FusionEngine::new(&config, &NoopObserver);
        let tokens: Vec<_> = objects.iter().map(keyword_tokens).collect();
        let score = engine
            .score_pair(&objects[0], &objects[1], &tokens[0], &tokens[1], Some(&index))
            .expect("semantic pair");
        assert!(score.scores.semantic.abs() < f64::EPSILON);
        assert!((score.raw_semantic.expect("raw cosine") + 1.0).abs() < 1e-9);
        assert!((score.combined - 0.3).abs() < 1e-9);
    }

    #[test]
    fn empty_tokens_still_score_in_semantic_branch() {
        let config = InferenceConfig {
            use_semantic_similarity: true,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["auth"]), tagged("o2", &[])];
        let index: EmbeddingIndex = [("o1", vec![1.0, 0.0]), ("o2", vec![0.6, 0.8])]
            .into_iter()
            .collect();
        let engine = FusionEngine::new(&config, &NoopObserver);
        let tokens: Vec<_> = objects.iter().map(keyword_tokens).collect();
        assert!(tokens[1].is_empty());

        let score = engine
            .score_pair(&objects[0], &objects[1], &tokens[0], &tokens[1], Some(&index))
            .expect("semantic pair is scored");
        assert_eq!(score.weights.branch.as_str(), "semantic+keyword");
        assert!(score.scores.keyword.abs() < f64::EPSILON);
        assert!(score.shared_keywords.is_empty());
        // 0.7 * 0.6 + 0.3 * 0.0
        assert!((score.combined - 0.42).abs() < 1e-6);
        assert!((score.threshold - 0.85).abs() < 1e-12);
        assert!(!score.passes());
    }

    #[test]
    fn missing_embedding_falls_back_to_keyword_gate() {
        let config = InferenceConfig {
            use_semantic_similarity: true,
            keyword_overlap_threshold: 0.5,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["a", "b"]), tagged("o2", &["a", "b"])];
        let index: EmbeddingIndex = [("o1", vec![1.0])].into_iter().collect();
        let rels = run(&config, &objects, Some(&index));
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].metadata.fusion_branch.as_deref(), Some("keyword"));
        assert!(rels[0].metadata.semantic_similarity.is_none());
    }

    #[test]
    fn project_and_schema_only_in_semantic_branch() {
        let config = InferenceConfig {
            use_semantic_similarity: true,
            use_project_metadata: true,
            use_schema_signal: true,
            similarity_threshold: 0.0,
            ..InferenceConfig::default()
        };
        let mut a = tagged("jira-core-1", &["auth"]);
        let mut b = tagged("jira-core-2", &["auth"]);
        a.actors.assignees = vec!["bob".into()];
        b.actors.assignees = vec!["bob".into()];
        let index: EmbeddingIndex = [("jira-core-1", vec![1.0, 0.0]), ("jira-core-2", vec![1.0, 0.0])]
            .into_iter()
            .collect();
        let rels = run(&config, &[a, b], Some(&index));
        let meta = &rels[0].metadata;
        assert_eq!(meta.project_similarity, Some(1.0));
        assert_eq!(meta.schema_similarity, Some(1.0));
        assert_eq!(meta.evidence, vec!["schema:shared_assignee".to_string()]);
        assert!((rels[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_ids_are_not_paired() {
        let config = InferenceConfig {
            keyword_overlap_threshold: 0.1,
            ..InferenceConfig::default()
        };
        let objects = [tagged("o1", &["a"]), tagged("o1", &["a"])];
        assert!(run(&config, &objects, None).is_empty());
    }

    #[test]
    fn cancelled_token_aborts() {
        let token = CancellationToken::new();
        token.cancel();
        let config = InferenceConfig::default();
        let objects = [tagged("o1", &["a"]), tagged("o2", &["a"])];
        let result = FusionEngine::new(&config, &NoopObserver).run(&objects, None, &token);
        assert_eq!(result, Err(Cancelled));
    }
}
