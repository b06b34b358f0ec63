use indexmap::IndexMap;

use super::ast::{GNode, GRel};
use super::value::PropValue;

/// Anything that can be dropped into a clause argument list: it renders to
/// a pattern fragment and knows which parameters it carries. Replaces the
/// reference's duck-typed `"nodes" in vars(type(ent))` probing during
/// parameter capture - every clause argument here exposes `params()`
/// directly instead of being inspected for it after the fact.
pub trait CypherPattern {
    fn pattern(&self) -> String;
    fn params(&self) -> IndexMap<String, PropValue> {
        IndexMap::new()
    }
}

impl CypherPattern for str {
    fn pattern(&self) -> String {
        self.to_string()
    }
}

impl CypherPattern for String {
    fn pattern(&self) -> String {
        self.clone()
    }
}

/// How a [`GNode`] occurrence should render within a pattern.
#[derive(Debug, Clone)]
pub enum NodeSlot {
    /// `(n0:label {k:'v'})`
    Full(GNode),
    /// `(n0)` - reuse after an initial labeled occurrence.
    PlainVar(GNode),
    /// bare `n0` - for WITH / RETURN style positions.
    Var(GNode),
}

impl NodeSlot {
    pub fn node(&self) -> &GNode {
        match self {
            NodeSlot::Full(n) | NodeSlot::PlainVar(n) | NodeSlot::Var(n) => n,
        }
    }
}

impl CypherPattern for NodeSlot {
    fn pattern(&self) -> String {
        match self {
            NodeSlot::Full(n) => n.pattern(),
            NodeSlot::PlainVar(n) => n.plain_var(),
            NodeSlot::Var(n) => n.var(),
        }
    }

    fn params(&self) -> IndexMap<String, PropValue> {
        match self {
            NodeSlot::Full(n) => n.props.values().map(|p| (p.var.clone(), p.value.clone())).collect(),
            NodeSlot::PlainVar(_) | NodeSlot::Var(_) => IndexMap::new(),
        }
    }
}

/// How a [`GRel`] occurrence should render within a pattern.
#[derive(Debug, Clone)]
pub enum RelSlot {
    /// `[r0:type {k:'v'}]`
    Full(GRel),
    /// `[:type]` - unbound, avoids a duplicate-variable collision when the
    /// same relationship type is reused twice in one MATCH.
    Anon(GRel),
    /// bare `r0`.
    Var(GRel),
}

impl RelSlot {
    pub fn rel(&self) -> &GRel {
        match self {
            RelSlot::Full(r) | RelSlot::Anon(r) | RelSlot::Var(r) => r,
        }
    }
}

impl CypherPattern for RelSlot {
    fn pattern(&self) -> String {
        match self {
            RelSlot::Full(r) => r.pattern(),
            RelSlot::Anon(r) => r.anon(),
            RelSlot::Var(r) => r.var(),
        }
    }

    fn params(&self) -> IndexMap<String, PropValue> {
        match self {
            RelSlot::Full(r) => r.props.values().map(|p| (p.var.clone(), p.value.clone())).collect(),
            RelSlot::Anon(_) | RelSlot::Var(_) => IndexMap::new(),
        }
    }
}

/// An ordered directed pair: left-to-right is the implied direction,
/// `(src)-[rel]->(dst)`.
#[derive(Debug, Clone)]
pub struct Triple {
    pub src: NodeSlot,
    pub rel: RelSlot,
    pub dst: NodeSlot,
}

impl Triple {
    pub fn new(src: NodeSlot, rel: RelSlot, dst: NodeSlot) -> Self {
        Triple { src, rel, dst }
    }
}

impl CypherPattern for Triple {
    fn pattern(&self) -> String {
        format!("{}-{}->{}", self.src.pattern(), self.rel.pattern(), self.dst.pattern())
    }

    fn params(&self) -> IndexMap<String, PropValue> {
        let mut out = self.src.params();
        out.extend(self.rel.params());
        out.extend(self.dst.params());
        out
    }
}

/// A pre-rendered fragment carried forward as a single opaque argument -
/// used when a clause needs to splice in another clause's already-rendered
/// text (and its already-harvested params) rather than re-deriving either,
/// e.g. reusing a parent's MATCH pattern inside a Tag's MATCH clause.
#[derive(Debug, Clone)]
pub struct Rendered {
    text: String,
    params: IndexMap<String, PropValue>,
}

impl Rendered {
    pub fn new(text: String, params: IndexMap<String, PropValue>) -> Self {
        Rendered { text, params }
    }
}

impl CypherPattern for Rendered {
    fn pattern(&self) -> String {
        self.text.clone()
    }

    fn params(&self) -> IndexMap<String, PropValue> {
        self.params.clone()
    }
}

/// An ordered, connected sequence of [`Triple`]s, rendered comma-joined as
/// a single pattern clause argument (Neo4j treats a comma-separated list
/// of patterns within one MATCH as one connected path match).
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub triples: Vec<Triple>,
}

impl Path {
    pub fn new(triples: Vec<Triple>) -> Self {
        Path { triples }
    }
}

impl CypherPattern for Path {
    fn pattern(&self) -> String {
        self.triples
            .iter()
            .map(Triple::pattern)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn params(&self) -> IndexMap<String, PropValue> {
        let mut out = IndexMap::new();
        for t in &self.triples {
            out.extend(t.params());
        }
        out
    }
}
