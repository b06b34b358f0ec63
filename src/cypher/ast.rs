use indexmap::IndexMap;

use super::value::PropValue;

/// Replaces the reference implementation's process-wide `N`/`R` variable
/// counters (and the save/restore dance around a global parameterization
/// flag) with an explicit context threaded through construction. A fresh
/// `BuilderContext` - or an explicit `reset()` - corresponds to a counter
/// reset boundary in the reference: one per statement pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuilderContext {
    next_node: u32,
    next_rel: u32,
}

impl BuilderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.next_node = 0;
        self.next_rel = 0;
    }

    fn alloc_node(&mut self) -> u32 {
        let n = self.next_node;
        self.next_node += 1;
        n
    }

    fn alloc_rel(&mut self) -> u32 {
        let n = self.next_rel;
        self.next_rel += 1;
        n
    }
}

/// A key/value pair attached to a [`GNode`] or [`GRel`]. `var` is the stable
/// parameter name used when a caller wants parameterized rendering rather
/// than inlined literals.
#[derive(Debug, Clone, PartialEq)]
pub struct GProp {
    pub key: String,
    pub value: PropValue,
    pub var: String,
}

impl GProp {
    fn render(&self) -> String {
        format!("{}:{}", self.key, self.value.render())
    }
}

fn props_from(owner_var: &str, attrs: IndexMap<String, PropValue>) -> IndexMap<String, GProp> {
    attrs
        .into_iter()
        .map(|(key, value)| {
            let var = format!("{owner_var}_{key}");
            (key.clone(), GProp { key, value, var })
        })
        .collect()
}

/// A pattern node: `(n0:label {k:'v'})`.
#[derive(Debug, Clone, PartialEq)]
pub struct GNode {
    var: String,
    pub label: Option<String>,
    pub props: IndexMap<String, GProp>,
}

impl GNode {
    pub fn new(ctx: &mut BuilderContext, label: Option<&str>, props: IndexMap<String, PropValue>) -> Self {
        let var = format!("n{}", ctx.alloc_node());
        let props = props_from(&var, props);
        GNode {
            var,
            label: label.map(str::to_string),
            props,
        }
    }

    /// Bare identifier for use in SET/DELETE/REMOVE clauses: `n0`.
    pub fn var(&self) -> String {
        self.var.clone()
    }

    /// Bare-variable pattern for reuse after an initial labeled occurrence:
    /// `(n0)`.
    pub fn plain_var(&self) -> String {
        format!("({})", self.var)
    }

    /// Full labeled-and-propertied pattern: `(n0:label {k:'v'})`.
    pub fn pattern(&self) -> String {
        let mut out = String::from("(");
        out.push_str(&self.var);
        if let Some(label) = &self.label {
            out.push(':');
            out.push_str(label);
        }
        if !self.props.is_empty() {
            out.push_str(" {");
            out.push_str(
                &self
                    .props
                    .values()
                    .map(GProp::render)
                    .collect::<Vec<_>>()
                    .join(","),
            );
            out.push('}');
        }
        out.push(')');
        out
    }
}

/// A pattern relationship of a named type: `[r0:type]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GRel {
    var: String,
    pub rel_type: Option<String>,
    pub props: IndexMap<String, GProp>,
}

impl GRel {
    pub fn new(ctx: &mut BuilderContext, rel_type: Option<&str>, props: IndexMap<String, PropValue>) -> Self {
        let var = format!("r{}", ctx.alloc_rel());
        let props = props_from(&var, props);
        GRel {
            var,
            rel_type: rel_type.map(str::to_string),
            props,
        }
    }

    /// Bare identifier: `r0`. Relationships have no distinct "plain_var"
    /// rendering the way nodes do - the reference's `var()` and
    /// `plain_var()` are the same string for a relationship.
    pub fn var(&self) -> String {
        self.var.clone()
    }

    pub fn plain_var(&self) -> String {
        self.var.clone()
    }

    /// Full labeled pattern: `[r0:type {k:'v'}]`.
    pub fn pattern(&self) -> String {
        self.render(Some(&self.var))
    }

    /// Unbound pattern `[:type]`, used when the same relationship type is
    /// reused twice within one MATCH and a bound variable would collide
    /// (the mapping synthesizer's two parent-rel triples, for instance).
    pub fn anon(&self) -> String {
        self.render(None)
    }

    fn render(&self, var: Option<&str>) -> String {
        let mut out = String::from("[");
        if let Some(v) = var {
            out.push_str(v);
        }
        if let Some(rt) = &self.rel_type {
            out.push(':');
            out.push_str(rt);
        }
        if !self.props.is_empty() {
            out.push_str(" {");
            out.push_str(
                &self
                    .props
                    .values()
                    .map(GProp::render)
                    .collect::<Vec<_>>()
                    .join(","),
            );
            out.push('}');
        }
        out.push(']');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, PropValue)]) -> IndexMap<String, PropValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn counters_reset_to_zero() {
        let mut ctx = BuilderContext::new();
        let _ = GNode::new(&mut ctx, Some("node"), IndexMap::new());
        let _ = GNode::new(&mut ctx, Some("node"), IndexMap::new());
        ctx.reset();
        let n = GNode::new(&mut ctx, Some("node"), IndexMap::new());
        assert_eq!(n.var(), "n0");
    }

    #[test]
    fn node_pattern_preserves_prop_insertion_order() {
        let mut ctx = BuilderContext::new();
        let n = GNode::new(
            &mut ctx,
            Some("node"),
            props(&[
                ("handle", PropValue::str("subject")),
                ("model", PropValue::str("TEST")),
            ]),
        );
        assert_eq!(n.pattern(), "(n0:node {handle:'subject',model:'TEST'})");
        assert_eq!(n.plain_var(), "(n0)");
    }

    #[test]
    fn rel_anon_omits_variable() {
        let mut ctx = BuilderContext::new();
        let r = GRel::new(&mut ctx, Some("has_src"), IndexMap::new());
        assert_eq!(r.pattern(), "[r0:has_src]");
        assert_eq!(r.anon(), "[:has_src]");
    }
}
