use indexmap::IndexMap;

use super::entity::{Edge, Node, Property, Term};

/// Root metamodel entity, identified by a handle. Holds the traversal
/// collections the model mapper and diff splitter consume.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub handle: String,
    pub nodes: IndexMap<String, Node>,
    pub edges: IndexMap<(String, String, String), Edge>,
    pub props: IndexMap<(String, String), Property>,
    pub terms: IndexMap<(String, String), Term>,
}

impl Model {
    pub fn new(handle: impl Into<String>) -> Self {
        Model {
            handle: handle.into(),
            ..Default::default()
        }
    }

    /// True when the model is a flat bag of Terms with no node/edge/prop
    /// structure - the controlled-vocabulary-only loading mode.
    pub fn is_terms_only(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.props.is_empty() && !self.terms.is_empty()
    }
}
