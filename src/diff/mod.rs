//! Semantic-diff decomposition: given two model versions' changes
//! already computed as a [`types::Diff`], produce ordered forward/rollback
//! Cypher statement pairs.

pub mod splitter;
pub mod types;

pub use splitter::DiffSplitter;
pub use types::{
    edge_key_from_parts, entity_from_key, prop_key_from_parts, term_key_from_parts, AttrChange, ChangedEntity, Diff,
    EdgeKey, EntityDiff, NodeKey, PropKey, TermKey,
};
