//! LLM-backed relatedness judgement from worked examples.
//!
//! A prompt is built from a bank of positive and negative example pairs plus
//! the two records under test, sent to an injected [`RelatednessJudge`], and
//! the one-word reply is parsed into a [`Verdict`]. Related pairs become a
//! mirrored pair of `similar_to` edges with source `inferred`.

pub mod classifier;
#[cfg(feature = "openai")]
pub mod http;
pub mod judge;
pub mod prompt;

pub use classifier::{
    CONTRASTIVE_CONFIDENCE, CONTRASTIVE_METHOD, ContrastiveClassifier, Verdict, backoff_delay,
    parse_verdict,
};
#[cfg(feature = "openai")]
pub use http::OpenAiJudge;
pub use judge::{JudgeError, RelatednessJudge};
pub use prompt::{PromptTemplate, build_prompt, render_examples, truncate_on_word_boundary};
