//! Cypher AST and statement builder (property-graph entities, patterns,
//! clauses, statements) with deterministic variable naming and automatic
//! parameter capture.

pub mod ast;
pub mod clause;
pub mod pattern;
pub mod statement;
pub mod value;

pub use ast::{BuilderContext, GNode, GProp, GRel};
pub use clause::{
    assignment_expr, case, create, delete, detach_delete, foreach, literal, match_, merge,
    on_create_set, optional_match, remove, removal_expr, set_, when, with, Clause,
};
pub use pattern::{CypherPattern, NodeSlot, Path, RelSlot, Rendered, Triple};
pub use statement::Statement;
pub use value::{escape_quotes, PropValue};
