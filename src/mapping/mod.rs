//! Mapping synthesizer layer (L3, §4.5): parses the cross-model Mapping
//! MDF document and turns each named property-equivalence pair into a
//! concept-linking Cypher statement.

pub mod doc;
pub mod synth;

pub use doc::{parents_as_list, last_parent, MappingDoc, PropertyLink};
pub use synth::{link_statement, link_statements};
