//! Core data model: normalized objects in, typed relations out.

pub mod object;
pub mod object_id;
pub mod relation;

pub use object::{Actors, CanonicalObject, ObjectRelations, Properties, Timestamps};
pub use relation::{Relation, RelationMetadata, RelationSource, RelationType};
