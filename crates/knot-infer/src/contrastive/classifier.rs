//! Bounded-concurrency pair classification with retry and timeout.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use futures_util::stream::{self, StreamExt};
use knot_core::cancel::{CancellationToken, Cancelled};
use knot_core::config::{ContrastiveConfig, LlmConfig};
use knot_core::model::{CanonicalObject, Relation, RelationMetadata, RelationSource, RelationType};

use crate::contrastive::judge::{JudgeError, RelatednessJudge};
use crate::contrastive::prompt::PromptTemplate;
use crate::observer::{InferenceObserver, NoopObserver};
use crate::pairs::PairIndices;

/// Confidence given to every judge-accepted edge.
pub const CONTRASTIVE_CONFIDENCE: f64 = 0.9;

/// `metadata.method` on judge-accepted edges.
pub const CONTRASTIVE_METHOD: &str = "contrastive_icl";

const NEGATIVE_MARKERS: [&str; 4] = ["NOT_RELATED", "NOT RELATED", "NOT-RELATED", "UNRELATED"];

/// Parsed judge reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Related,
    NotRelated,
    /// Neither marker found; treated as not related.
    Unclear,
}

/// Interpret a judge reply. Negative markers win over the positive one.
///
/// ```
/// use knot_infer::contrastive::{Verdict, parse_verdict};
///
/// assert_eq!(parse_verdict("RELATED"), Verdict::Related);
/// assert_eq!(parse_verdict("not related."), Verdict::NotRelated);
/// assert_eq!(parse_verdict("maybe?"), Verdict::Unclear);
/// ```
#[must_use]
pub fn parse_verdict(reply: &str) -> Verdict {
    let upper = reply.to_uppercase();
    if NEGATIVE_MARKERS.iter().any(|m| upper.contains(m)) {
        Verdict::NotRelated
    } else if upper.contains("RELATED") {
        Verdict::Related
    } else {
        Verdict::Unclear
    }
}

/// Delay before retry number `attempt + 1`: `initial · 2^attempt`, capped.
#[must_use]
pub fn backoff_delay(llm: &LlmConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    let exponential = llm
        .initial_backoff_ms
        .saturating_mul(2_u64.saturating_pow(attempt));
    let wanted = retry_after_ms.map_or(exponential, |hint| hint.max(exponential));
    Duration::from_millis(wanted.min(llm.max_backoff_ms))
}

/// Asks a [`RelatednessJudge`] about every pair of objects.
pub struct ContrastiveClassifier {
    config: ContrastiveConfig,
    prompt: PromptTemplate,
    judge: Arc<dyn RelatednessJudge>,
    observer: Arc<dyn InferenceObserver>,
}

impl ContrastiveClassifier {
    #[must_use]
    pub fn new(config: ContrastiveConfig, judge: Arc<dyn RelatednessJudge>) -> Self {
        Self {
            prompt: PromptTemplate::from_config(&config),
            config,
            judge,
            observer: Arc::new(NoopObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InferenceObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// One judge call guarded by the per-call timeout, retried with
    /// exponential backoff while the error is retryable.
    ///
    /// # Errors
    ///
    /// Returns the last [`JudgeError`] once retries are exhausted or a
    /// non-retryable error occurs.
    pub async fn ask(&self, prompt: &str) -> Result<String, JudgeError> {
        let llm = &self.config.llm;
        let limit = Duration::from_secs(llm.timeout_secs);
        let mut attempt = 0_u32;

        loop {
            let outcome = tokio::time::timeout(limit, self.judge.classify(prompt))
                .await
                .unwrap_or(Err(JudgeError::Timeout {
                    secs: llm.timeout_secs,
                }));

            match outcome {
                Err(err) if err.is_retryable() && attempt < llm.max_retries => {
                    let hint = match &err {
                        JudgeError::RateLimited { retry_after_ms } => *retry_after_ms,
                        _ => None,
                    };
                    let delay = backoff_delay(llm, attempt, hint);
                    tracing::debug!(
                        judge = self.judge.name(),
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying judge call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Judge one pair. Failures are logged and count as not related.
    pub async fn judge_pair(&self, a: &CanonicalObject, b: &CanonicalObject) -> Verdict {
        let prompt = self.prompt.render(a.display_text(), b.display_text());
        match self.ask(&prompt).await {
            Ok(reply) => {
                let verdict = parse_verdict(&reply);
                if verdict == Verdict::Unclear {
                    tracing::debug!(a = %a.id, b = %b.id, reply = %reply.trim(), "unclear judge reply");
                }
                verdict
            }
            Err(err) => {
                tracing::warn!(
                    a = %a.id,
                    b = %b.id,
                    judge = self.judge.name(),
                    code = %err.code(),
                    error = %err,
                    "judge failed, treating pair as unrelated"
                );
                self.observer.judge_failed(&a.id, &b.id, &err);
                Verdict::Unclear
            }
        }
    }

    /// Classify every pair with at most `llm.concurrency` calls in flight.
    ///
    /// Edges come out in pair order regardless of completion order, each
    /// forward edge immediately followed by its mirror. The token is checked
    /// before each pair is scheduled; calls already in flight run to
    /// completion (bounded by the timeout) before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the token fires before every pair was judged.
    pub async fn run(
        &self,
        objects: &[CanonicalObject],
        cancel: &CancellationToken,
    ) -> Result<Vec<Relation>, Cancelled> {
        cancel.check()?;
        let concurrency = self.config.llm.concurrency.max(1);

        let pairs = PairIndices::new(objects.len())
            .filter(|&(i, j)| objects[i].id != objects[j].id)
            .enumerate();

        let mut accepted: Vec<(usize, usize, usize)> = stream::iter(pairs)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|(order, (i, j))| async move {
                let verdict = self.judge_pair(&objects[i], &objects[j]).await;
                (order, i, j, verdict)
            })
            .buffer_unordered(concurrency)
            .filter_map(|(order, i, j, verdict)| {
                future::ready((verdict == Verdict::Related).then_some((order, i, j)))
            })
            .collect()
            .await;

        cancel.check()?;
        accepted.sort_unstable_by_key(|&(order, _, _)| order);

        let mut out = Vec::with_capacity(accepted.len() * 2);
        for (_, i, j) in accepted {
            let forward = Relation::new(
                objects[i].id.as_str(),
                objects[j].id.as_str(),
                RelationType::SimilarTo,
                RelationSource::Inferred,
                CONTRASTIVE_CONFIDENCE,
            )
            .with_metadata(RelationMetadata {
                method: Some(CONTRASTIVE_METHOD.to_string()),
                ..RelationMetadata::default()
            });
            out.extend(Relation::mirrored_pair(forward));
        }

        tracing::debug!(
            judge = self.judge.name(),
            relations = out.len(),
            "contrastive classification done"
        );
        Ok(out)
    }
}
