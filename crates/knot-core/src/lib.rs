//! knot-core library.
//!
//! Shared vocabulary for the relation engine: normalized input objects, typed
//! relation edges, the inference configuration, and error codes.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per concern, each mapping to an
//!   [`error::ErrorCode`]; `anyhow::Result` for file loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`). The
//!   library never installs a subscriber.

pub mod cancel;
pub mod config;
pub mod error;
pub mod model;

pub use cancel::{CancellationToken, Cancelled};
pub use config::{CanonicalRule, ConfigError, InferenceConfig};
pub use model::{CanonicalObject, Relation, RelationMetadata, RelationSource, RelationType};
