//! Metamodel entity taxonomy (Node, Edge, Property, Term, ValueSet,
//! Concept, Tag, Origin) and the Model that roots them.

pub mod entity;
pub mod model;

pub use entity::{AttrKind, Concept, Edge, Entity, Node, Origin, Property, RelSpec, Tag, Term, ValueSet};
pub use model::Model;
