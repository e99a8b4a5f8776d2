//! Multi-signal fusion of pairwise scores into `similar_to` edges.

pub mod engine;
pub mod weights;

pub use engine::{FusionEngine, PairScore};
pub use weights::{FusionBranch, FusionWeights, SignalScores};
