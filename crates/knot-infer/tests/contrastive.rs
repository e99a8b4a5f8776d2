//! Contrastive stage against scripted judges, on paused tokio time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use knot_core::cancel::{CancellationToken, Cancelled};
use knot_core::config::{ContrastiveConfig, InferenceConfig};
use knot_core::model::{CanonicalObject, RelationSource, RelationType};
use knot_infer::contrastive::{
    CONTRASTIVE_METHOD, ContrastiveClassifier, JudgeError, RelatednessJudge,
};
use knot_infer::{InferenceObserver, RelationEngine};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Script = dyn Fn(usize, &str) -> (Duration, Result<String, JudgeError>) + Send + Sync;

/// Replies according to a script keyed by call number and prompt.
struct ScriptedJudge {
    calls: AtomicUsize,
    script: Box<Script>,
}

impl ScriptedJudge {
    fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(usize, &str) -> (Duration, Result<String, JudgeError>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Box::new(script),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelatednessJudge for ScriptedJudge {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify(&self, prompt: &str) -> Result<String, JudgeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, reply) = (self.script)(n, prompt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

#[derive(Default)]
struct FailureLog {
    failures: Mutex<Vec<(String, String, JudgeError)>>,
}

impl InferenceObserver for FailureLog {
    fn judge_failed(&self, a: &str, b: &str, error: &JudgeError) {
        self.failures
            .lock()
            .expect("lock")
            .push((a.to_string(), b.to_string(), error.clone()));
    }
}

fn titled(id: &str, title: &str) -> CanonicalObject {
    let mut obj = CanonicalObject::new(id);
    obj.title = title.to_string();
    obj
}

fn settings(concurrency: usize) -> ContrastiveConfig {
    let mut cfg = ContrastiveConfig {
        prompt_template: "{text_a}|{text_b}".to_string(),
        ..ContrastiveConfig::default()
    };
    cfg.llm.concurrency = concurrency;
    cfg.llm.timeout_secs = 30;
    cfg.llm.max_retries = 3;
    cfg.llm.initial_backoff_ms = 500;
    cfg
}

fn related() -> (Duration, Result<String, JudgeError>) {
    (Duration::ZERO, Ok("RELATED".to_string()))
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn output_follows_pair_order_not_completion_order() {
    let objects = [
        titled("o0", "alpha"),
        titled("o1", "beta"),
        titled("o2", "gamma"),
        titled("o3", "delta"),
    ];
    // Early calls are slowest, so completion order is reversed.
    let judge = ScriptedJudge::new(|n, _| {
        let delay = Duration::from_millis(100 * (10 - n as u64));
        (delay, Ok("RELATED".to_string()))
    });
    let classifier = ContrastiveClassifier::new(settings(4), judge.clone());

    let rels = classifier
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");

    let ids: Vec<_> = rels.iter().map(|r| (r.from_id.as_str(), r.to_id.as_str())).collect();
    assert_eq!(
        ids,
        vec![
            ("o0", "o1"), ("o1", "o0"),
            ("o0", "o2"), ("o2", "o0"),
            ("o0", "o3"), ("o3", "o0"),
            ("o1", "o2"), ("o2", "o1"),
            ("o1", "o3"), ("o3", "o1"),
            ("o2", "o3"), ("o3", "o2"),
        ]
    );
    assert_eq!(judge.calls(), 6);
    for rel in &rels {
        assert_eq!(rel.relation_type, RelationType::SimilarTo);
        assert_eq!(rel.source, RelationSource::Inferred);
        assert!((rel.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(rel.metadata.method.as_deref(), Some(CONTRASTIVE_METHOD));
    }
}

#[tokio::test(start_paused = true)]
async fn only_related_replies_produce_edges() {
    let objects = [
        titled("o0", "login crash"),
        titled("o1", "login fails"),
        titled("o2", "new logo"),
    ];
    let judge = ScriptedJudge::new(|_, prompt| {
        let reply = if prompt.contains("logo") {
            "NOT_RELATED"
        } else {
            "RELATED"
        };
        (Duration::ZERO, Ok(reply.to_string()))
    });
    let rels = ContrastiveClassifier::new(settings(2), judge)
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");
    assert_eq!(rels.len(), 2);
    assert_eq!(rels[0].from_id, "o0");
    assert_eq!(rels[0].to_id, "o1");
}

#[tokio::test(start_paused = true)]
async fn prompt_uses_display_text() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let judge = ScriptedJudge::new(move |_, prompt| {
        sink.lock().expect("lock").push(prompt.to_string());
        related()
    });
    let objects = [titled("gh-web-1", ""), titled("gh-web-2", "Checkout broken")];
    ContrastiveClassifier::new(settings(1), judge)
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");
    assert_eq!(*seen.lock().expect("lock"), vec!["gh-web-1|Checkout broken".to_string()]);
}

// ---------------------------------------------------------------------------
// Retry and timeout
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rate_limit_is_retried_then_succeeds() {
    let judge = ScriptedJudge::new(|n, _| {
        if n == 0 {
            (
                Duration::ZERO,
                Err(JudgeError::RateLimited {
                    retry_after_ms: None,
                }),
            )
        } else {
            related()
        }
    });
    let objects = [titled("a", "one"), titled("b", "two")];
    let start = tokio::time::Instant::now();
    let rels = ContrastiveClassifier::new(settings(1), judge.clone())
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");

    assert_eq!(rels.len(), 2);
    assert_eq!(judge.calls(), 2);
    assert!(start.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_count_as_unrelated() {
    let judge = ScriptedJudge::new(|_, _| {
        (
            Duration::ZERO,
            Err(JudgeError::Unavailable("HTTP 503".to_string())),
        )
    });
    let log = Arc::new(FailureLog::default());
    let objects = [titled("a", "one"), titled("b", "two")];
    let rels = ContrastiveClassifier::new(settings(1), judge.clone())
        .with_observer(log.clone())
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");

    assert!(rels.is_empty());
    assert_eq!(judge.calls(), 4);
    let failures = log.failures.lock().expect("lock");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].2, JudgeError::Unavailable("HTTP 503".to_string()));
}

#[tokio::test(start_paused = true)]
async fn timeout_yields_no_edge_and_is_not_retried() {
    let judge = ScriptedJudge::new(|_, _| (Duration::from_secs(120), Ok("RELATED".to_string())));
    let log = Arc::new(FailureLog::default());
    let objects = [titled("a", "one"), titled("b", "two")];
    let rels = ContrastiveClassifier::new(settings(1), judge.clone())
        .with_observer(log.clone())
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");

    assert!(rels.is_empty());
    assert_eq!(judge.calls(), 1);
    assert_eq!(
        log.failures.lock().expect("lock")[0].2,
        JudgeError::Timeout { secs: 30 }
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_request_is_final() {
    let judge = ScriptedJudge::new(|_, _| {
        (
            Duration::ZERO,
            Err(JudgeError::Rejected {
                status: 401,
                body: "bad key".to_string(),
            }),
        )
    });
    let objects = [titled("a", "one"), titled("b", "two")];
    let rels = ContrastiveClassifier::new(settings(1), judge.clone())
        .run(&objects, &CancellationToken::new())
        .await
        .expect("not cancelled");
    assert!(rels.is_empty());
    assert_eq!(judge.calls(), 1);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancel_before_run_schedules_nothing() {
    let judge = ScriptedJudge::new(|_, _| related());
    let token = CancellationToken::new();
    token.cancel();
    let objects = [titled("a", "one"), titled("b", "two")];
    let result = ContrastiveClassifier::new(settings(2), judge.clone())
        .run(&objects, &token)
        .await;
    assert_eq!(result, Err(Cancelled));
    assert_eq!(judge.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_run_stops_scheduling() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let judge = ScriptedJudge::new(move |n, _| {
        if n == 1 {
            trigger.cancel();
        }
        related()
    });
    let objects: Vec<_> = (0..6).map(|i| titled(&format!("o{i}"), "same")).collect();
    let result = ContrastiveClassifier::new(settings(1), judge.clone())
        .run(&objects, &token)
        .await;

    assert_eq!(result, Err(Cancelled));
    assert_eq!(judge.calls(), 2);
}

// ---------------------------------------------------------------------------
// Engine integration
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn engine_appends_contrastive_edges_last() {
    let mut config = InferenceConfig {
        use_contrastive_icl: true,
        contrastive: settings(2),
        ..InferenceConfig::default()
    };
    config.contrastive.prompt_template = "{text_a} / {text_b}".to_string();

    let mut a = titled("jira-core-1", "Checkout fails");
    a.actors.created_by = Some("alice".into());
    let b = titled("jira-core-2", "Payment step broken");

    let judge = ScriptedJudge::new(|_, _| related());
    let graph = RelationEngine::new(config)
        .expect("valid config")
        .infer_with_judge(&[a, b], None, Some(judge as Arc<dyn RelatednessJudge>), &CancellationToken::new())
        .await
        .expect("inference succeeds");

    let kinds: Vec<_> = graph.iter().map(|r| (r.relation_type, r.source)).collect();
    assert_eq!(
        kinds,
        vec![
            (RelationType::CreatedBy, RelationSource::Explicit),
            (RelationType::SimilarTo, RelationSource::Inferred),
            (RelationType::SimilarTo, RelationSource::Inferred),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn include_inferred_off_skips_judge() {
    let config = InferenceConfig {
        include_inferred: false,
        use_contrastive_icl: true,
        contrastive: settings(1),
        ..InferenceConfig::default()
    };
    let judge = ScriptedJudge::new(|_, _| related());
    let objects = [titled("a", "one"), titled("b", "two")];
    let graph = RelationEngine::new(config)
        .expect("valid config")
        .infer_with_judge(
            &objects,
            None,
            Some(judge.clone() as Arc<dyn RelatednessJudge>),
            &CancellationToken::new(),
        )
        .await
        .expect("inference succeeds");
    assert!(graph.is_empty());
    assert_eq!(judge.calls(), 0);
}
