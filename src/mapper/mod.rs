//! Model-to-graph mapper: reflects a metamodel entity into labeled graph
//! nodes plus typed relationships, with shared-property de-duplication
//! and full-model traversal.

pub mod full_model;
pub mod shared_props;

pub use full_model::ModelMapper;
pub use shared_props::separate_shared_props;
