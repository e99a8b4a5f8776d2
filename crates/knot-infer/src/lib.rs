#![forbid(unsafe_code)]
//! knot-infer library.
//!
//! Turns a flat collection of [`knot_core::CanonicalObject`]s into a typed,
//! confidence-scored relation graph. Stages, leaves first:
//!
//! - [`explicit`]: edges already present in structural fields
//! - [`duplicates`]: exact-duplicate groups by content hash
//! - [`signals`]: keyword, semantic, project, and schema scorers
//! - [`fusion`]: weighted combination and gating into `similar_to` edges
//! - [`threshold`]: document-level filter over cross-project groups
//! - [`contrastive`]: optional LLM judge over every pair
//! - [`aggregate`]: merged graph, lookups, statistics
//!
//! [`engine::RelationEngine`] wires them together.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums ([`engine::InferenceError`],
//!   [`contrastive::JudgeError`]) with stable codes from `knot_core::error`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod aggregate;
pub mod contrastive;
pub mod duplicates;
pub mod engine;
pub mod explicit;
pub mod fusion;
pub mod observer;
pub mod pairs;
pub mod signals;
pub mod threshold;

pub use aggregate::{EdgeDirection, RelationGraph, RelationStats};
pub use engine::{InferenceError, RelationEngine};
pub use observer::{InferenceObserver, NoopObserver, Stage, TracingObserver};
pub use signals::EmbeddingIndex;
