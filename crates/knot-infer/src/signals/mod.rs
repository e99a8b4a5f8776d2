//! Pure pairwise signal scorers.
//!
//! Each scorer maps a pair of objects (or their derived features) to a score
//! in `[0, 1]`. None of them allocate shared state or log; the fusion stage
//! decides which signals apply and reports anomalies.

pub mod keyword;
pub mod project;
pub mod schema;
pub mod semantic;

pub use keyword::{KeywordOverlap, jaccard, keyword_overlap, keyword_tokens};
pub use project::project_similarity;
pub use schema::{SchemaScore, SchemaSignal, schema_similarity};
pub use semantic::{DimensionMismatch, EmbeddingIndex, cosine_checked, cosine_similarity};
