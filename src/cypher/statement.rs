use indexmap::IndexMap;

use super::clause::Clause;
use super::value::PropValue;

/// An ordered sequence of clauses, rendered by concatenation with single
/// space joins and an optional terminating `;`.
///
/// The reference implementation toggles a process-wide parameterization
/// flag around `__str__` and saves/restores it; that global is gone here
/// because every [`Clause`] already carries its own harvested parameters,
/// so `params()` is always available regardless of how `render()` is
/// called.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    clauses: Vec<Clause>,
    terminate: bool,
}

impl Statement {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Statement {
            clauses,
            terminate: false,
        }
    }

    pub fn terminated(mut self) -> Self {
        self.terminate = true;
        self
    }

    pub fn render(&self) -> String {
        let mut out = self
            .clauses
            .iter()
            .map(Clause::render)
            .collect::<Vec<_>>()
            .join(" ");
        if self.terminate {
            out.push(';');
        }
        out
    }

    /// `{param_var -> value}`, gathered by walking every clause's already
    /// harvested parameters in clause order.
    pub fn params(&self) -> IndexMap<String, PropValue> {
        let mut out = IndexMap::new();
        for c in &self.clauses {
            out.extend(c.params().clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::ast::{BuilderContext, GNode};
    use crate::cypher::clause::{detach_delete, match_};
    use crate::cypher::pattern::NodeSlot;

    #[test]
    fn renders_clauses_joined_by_space() {
        let mut ctx = BuilderContext::new();
        let n = GNode::new(&mut ctx, Some("node"), IndexMap::new());
        let full = NodeSlot::Full(n.clone());
        let var = NodeSlot::Var(n);
        let stmt = Statement::new(vec![match_(&[&full]), detach_delete(&[&var])]).terminated();
        assert_eq!(stmt.render(), "MATCH (n0:node) DETACH DELETE n0;");
    }
}
