//! Orchestration of every stage into one batch call.
//!
//! Stage order (and the order of edges in the result):
//!
//! 1. explicit extraction
//! 2. duplicate detection (`enable_duplicate_detection`)
//! 3. fusion scoring, then the document filter (`include_inferred`,
//!    `use_document_threshold`)
//! 4. contrastive judgement (`include_inferred`, `use_contrastive_icl`;
//!    async entry point only)

use std::sync::Arc;

use knot_core::cancel::{CancellationToken, Cancelled};
use knot_core::config::{ConfigError, InferenceConfig};
use knot_core::error::ErrorCode;
use knot_core::model::{CanonicalObject, Relation};

use crate::aggregate::RelationGraph;
use crate::contrastive::{ContrastiveClassifier, RelatednessJudge};
use crate::duplicates::detect_duplicates;
use crate::explicit::extract_explicit;
use crate::fusion::FusionEngine;
use crate::observer::{InferenceObserver, Stage, TracingObserver};
use crate::signals::EmbeddingIndex;
use crate::threshold::apply_document_threshold;

/// Fatal errors of an inference run.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `use_contrastive_icl` is set but no judge was supplied.
    #[error("contrastive classification enabled but no relatedness judge supplied")]
    MissingJudge,

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl InferenceError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(err) => err.code(),
            Self::MissingJudge => ErrorCode::JudgeMissing,
            Self::Cancelled(_) => ErrorCode::Cancelled,
        }
    }
}

/// Validated configuration plus an observer; runs the full pipeline.
pub struct RelationEngine {
    config: InferenceConfig,
    observer: Arc<dyn InferenceObserver>,
}

impl std::fmt::Debug for RelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RelationEngine {
    /// # Errors
    ///
    /// Returns the first constraint `config` violates.
    pub fn new(config: InferenceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            observer: Arc::new(TracingObserver),
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InferenceObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Run every synchronous stage.
    ///
    /// The contrastive stage needs a judge and an async runtime; use
    /// [`infer_with_judge`](Self::infer_with_judge) for it. When it is
    /// enabled in the config this call skips it with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Cancelled`] if `cancel` fires mid-run.
    pub fn infer(
        &self,
        objects: &[CanonicalObject],
        embeddings: Option<&EmbeddingIndex>,
        cancel: &CancellationToken,
    ) -> Result<RelationGraph, InferenceError> {
        if self.contrastive_enabled() {
            tracing::warn!("contrastive classification requires infer_with_judge, skipping");
        }
        self.run_sync_stages(objects, embeddings, cancel)
    }

    /// Run every stage, including contrastive judgement when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::MissingJudge`] if the contrastive stage is
    /// enabled and `judge` is `None`, or [`InferenceError::Cancelled`] if
    /// `cancel` fires mid-run. Individual judge failures are not errors.
    pub async fn infer_with_judge(
        &self,
        objects: &[CanonicalObject],
        embeddings: Option<&EmbeddingIndex>,
        judge: Option<Arc<dyn RelatednessJudge>>,
        cancel: &CancellationToken,
    ) -> Result<RelationGraph, InferenceError> {
        let judge = if self.contrastive_enabled() {
            Some(judge.ok_or(InferenceError::MissingJudge)?)
        } else {
            None
        };

        let mut graph = self.run_sync_stages(objects, embeddings, cancel)?;

        if let Some(judge) = judge {
            let classifier = ContrastiveClassifier::new(self.config.contrastive.clone(), judge)
                .with_observer(Arc::clone(&self.observer));
            let inferred = classifier.run(objects, cancel).await?;
            self.finish(Stage::Contrastive, &inferred);
            graph.merge(inferred);
        }

        tracing::info!(objects = objects.len(), relations = graph.len(), "inference done");
        Ok(graph)
    }

    const fn contrastive_enabled(&self) -> bool {
        self.config.include_inferred && self.config.use_contrastive_icl
    }

    fn finish(&self, stage: Stage, relations: &[Relation]) {
        self.observer.stage_finished(stage, relations.len());
    }

    fn run_sync_stages(
        &self,
        objects: &[CanonicalObject],
        embeddings: Option<&EmbeddingIndex>,
        cancel: &CancellationToken,
    ) -> Result<RelationGraph, InferenceError> {
        let cfg = &self.config;
        cancel.check()?;

        let explicit = extract_explicit(objects);
        self.finish(Stage::Explicit, &explicit);
        let mut graph = RelationGraph::from_relations(explicit);

        if cfg.enable_duplicate_detection {
            let duplicates = detect_duplicates(objects, cfg.duplicate_canonical);
            self.finish(Stage::Duplicates, &duplicates);
            graph.merge(duplicates);
        }

        if cfg.include_inferred {
            let engine = FusionEngine::new(cfg, self.observer.as_ref());
            let mut similar = engine.run(objects, embeddings, cancel)?;
            self.finish(Stage::Fusion, &similar);

            if cfg.use_document_threshold {
                let outcome = apply_document_threshold(
                    similar,
                    cfg.document_threshold,
                    cfg.min_chunk_matches,
                );
                for group in outcome.dropped_groups() {
                    self.observer.group_dropped(group);
                }
                similar = outcome.relations;
                self.finish(Stage::DocumentThreshold, &similar);
            }

            graph.merge(similar);
        }

        Ok(graph)
    }
}
