use indexmap::IndexMap;

use super::pattern::{CypherPattern, Rendered};
use super::value::PropValue;

/// One rendered clause: a keyword plus its joined argument text, with the
/// parameters harvested from its arguments at construction time (so
/// [`crate::cypher::statement::Statement::params`] never has to re-walk
/// already-rendered text).
#[derive(Debug, Clone)]
pub struct Clause {
    pub keyword: &'static str,
    text: String,
    params: IndexMap<String, PropValue>,
}

impl Clause {
    fn build(keyword: &'static str, args: &[&dyn CypherPattern], sep: &str) -> Clause {
        let mut params = IndexMap::new();
        let parts: Vec<String> = args
            .iter()
            .map(|a| {
                params.extend(a.params());
                a.pattern()
            })
            .collect();
        Clause {
            keyword,
            text: format!("{} {}", keyword, parts.join(sep)),
            params,
        }
    }

    pub fn render(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &IndexMap<String, PropValue> {
        &self.params
    }
}

/// A clause-shaped wrapper around arbitrary pre-rendered text with no
/// keyword of its own - used for the Term rollback's literal `"empty"`
/// placeholder (Terms are shared reference data; rolling back their
/// creation is deliberately a no-op).
pub fn literal(text: impl Into<String>) -> Clause {
    Clause {
        keyword: "",
        text: text.into(),
        params: IndexMap::new(),
    }
}

pub fn match_(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("MATCH", args, ", ")
}

pub fn optional_match(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("OPTIONAL MATCH", args, ", ")
}

pub fn merge(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("MERGE", args, ", ")
}

pub fn create(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("CREATE", args, ", ")
}

pub fn set_(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("SET", args, ", ")
}

pub fn remove(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("REMOVE", args, ", ")
}

pub fn delete(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("DELETE", args, ", ")
}

pub fn detach_delete(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("DETACH DELETE", args, ", ")
}

pub fn with(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("WITH", args, ", ")
}

pub fn on_create_set(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("ON CREATE SET", args, ", ")
}

pub fn foreach(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("FOREACH", args, ", ")
}

pub fn case(args: &[&dyn CypherPattern]) -> Clause {
    Clause::build("CASE", args, " ")
}

/// `WHEN` joins its conditions with an operator (`AND` by default) rather
/// than a plain separator - the one clause kind in the reference with
/// non-uniform join semantics besides `FOREACH`'s list-comprehension body.
pub fn when(args: &[&dyn CypherPattern], op: &str) -> Clause {
    let sep = format!(" {op} ");
    Clause::build("WHEN", args, &sep)
}

/// `var.key = value` as a single clause argument, with the value's
/// parameter harvested the same way a GNode/GRel property would be - used
/// by SET and ON CREATE SET clauses, which assign to an already-matched
/// variable rather than a fresh pattern node.
pub fn assignment_expr(var: &str, key: &str, value: &PropValue) -> Rendered {
    let mut params = IndexMap::new();
    params.insert(format!("{var}_{key}"), value.clone());
    Rendered::new(format!("{var}.{key} = {}", value.render()), params)
}

/// `var.key` as a single clause argument - used by REMOVE, which carries
/// no value and therefore no parameter.
pub fn removal_expr(var: &str, key: &str) -> Rendered {
    Rendered::new(format!("{var}.{key}"), IndexMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::ast::{BuilderContext, GNode};
    use crate::cypher::pattern::NodeSlot;
    use indexmap::IndexMap;

    #[test]
    fn match_joins_with_comma_and_collects_params() {
        let mut ctx = BuilderContext::new();
        let mut props = IndexMap::new();
        props.insert("handle".to_string(), PropValue::str("subject"));
        let n = GNode::new(&mut ctx, Some("node"), props);
        let slot = NodeSlot::Full(n);
        let clause = match_(&[&slot]);
        assert_eq!(clause.render(), "MATCH (n0:node {handle:'subject'})");
        assert_eq!(clause.params().len(), 1);
    }
}
