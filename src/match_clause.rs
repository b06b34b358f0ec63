//! `generate_match_clause`: given an entity and a freshly-built pattern
//! node for it, produce a MATCH clause that uniquely identifies the
//! entity in a property graph holding all its ancestors.

use indexmap::IndexMap;

use crate::cypher::ast::{BuilderContext, GNode, GRel};
use crate::cypher::clause::{match_, Clause};
use crate::cypher::pattern::{NodeSlot, Path, RelSlot, Rendered, Triple};
use crate::error::{CoreError, CoreResult};
use crate::metamodel::{Edge, Entity, Property, Tag};

/// Builds a fresh, fully-decorated [`GNode`] for an entity: its label plus
/// its attribute dictionary (already free of `parent_handle`, see
/// [`Entity::attr_dict`]).
pub fn entity_to_gnode(ctx: &mut BuilderContext, entity: &Entity) -> GNode {
    GNode::new(ctx, Some(entity.label()), entity.attr_dict())
}

/// Entry point: dispatches on entity kind to produce the MATCH clause
/// that disambiguates `entity` using `ent_c` as its bound pattern node.
pub fn generate_match_clause(ctx: &mut BuilderContext, entity: &Entity, ent_c: &GNode) -> CoreResult<Clause> {
    match entity {
        Entity::Edge(e) => match_edge(ctx, e, ent_c),
        Entity::Property(p) => match_prop(ctx, p, ent_c),
        Entity::Tag(t) => match_tag(ctx, t, ent_c),
        _ => Ok(match_(&[&NodeSlot::Full(ent_c.clone())])),
    }
}

fn match_edge(ctx: &mut BuilderContext, edge: &Edge, ent_c: &GNode) -> CoreResult<Clause> {
    let src_c = GNode::new(ctx, Some("node"), edge.src.attrs.clone());
    let dst_c = GNode::new(ctx, Some("node"), edge.dst.attrs.clone());
    let has_src = GRel::new(ctx, Some("has_src"), IndexMap::new());
    let has_dst = GRel::new(ctx, Some("has_dst"), IndexMap::new());
    let src_trip = Triple::new(
        NodeSlot::Full(ent_c.clone()),
        RelSlot::Full(has_src),
        NodeSlot::Full(src_c),
    );
    // ent_c already appears fully-decorated in src_trip; the second
    // occurrence in the same MATCH reuses its bare variable (§3.2.1
    // `plain_var()` "reuse after an initial labeled occurrence").
    let dst_trip = Triple::new(
        NodeSlot::PlainVar(ent_c.clone()),
        RelSlot::Full(has_dst),
        NodeSlot::Full(dst_c),
    );
    let path = Path::new(vec![src_trip, dst_trip]);
    Ok(match_(&[&path]))
}

fn match_prop(ctx: &mut BuilderContext, prop: &Property, ent_c: &GNode) -> CoreResult<Clause> {
    if prop.parent_handle.is_empty() {
        return Err(CoreError::MissingParent {
            kind: "Property",
            detail: format!("{prop:?} has no parent_handle"),
        });
    }
    let mut par_props = IndexMap::new();
    par_props.insert(
        "handle".to_string(),
        crate::cypher::PropValue::str(prop.parent_handle.clone()),
    );
    let par_c = GNode::new(ctx, None, par_props);
    let has_property = GRel::new(ctx, Some("has_property"), IndexMap::new());
    let trip = Triple::new(
        NodeSlot::Full(par_c),
        RelSlot::Full(has_property),
        NodeSlot::Full(ent_c.clone()),
    );
    Ok(match_(&[&trip]))
}

fn match_tag(ctx: &mut BuilderContext, tag: &Tag, ent_c: &GNode) -> CoreResult<Clause> {
    let parent = tag.parent.as_deref().ok_or_else(|| CoreError::MissingParent {
        kind: "Tag",
        detail: format!("{tag:?} has no parent"),
    })?;
    let par_c = entity_to_gnode(ctx, parent);
    let par_match_clause = generate_match_clause(ctx, parent, &par_c)?;
    let par_match_text = par_match_clause
        .render()
        .strip_prefix("MATCH ")
        .unwrap_or(par_match_clause.render())
        .to_string();
    let par_rendered = Rendered::new(par_match_text, par_match_clause.params().clone());
    let has_tag = GRel::new(ctx, Some("has_tag"), IndexMap::new());
    let tag_trip = Triple::new(
        NodeSlot::PlainVar(par_c),
        RelSlot::Full(has_tag),
        NodeSlot::Full(ent_c.clone()),
    );
    Ok(match_(&[&par_rendered, &tag_trip]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::{Node, Property};

    #[test]
    fn match_node_is_bare_match() {
        let mut ctx = BuilderContext::new();
        let node = Entity::Node(Node::new("TEST", "subject"));
        let ent_c = entity_to_gnode(&mut ctx, &node);
        let clause = generate_match_clause(&mut ctx, &node, &ent_c).unwrap();
        assert_eq!(clause.render(), "MATCH (n0:node {handle:'subject',model:'TEST'})");
    }

    #[test]
    fn match_edge_reuses_bare_var_for_second_occurrence() {
        let mut ctx = BuilderContext::new();
        let edge = Entity::Edge(crate::metamodel::Edge::new(
            "TEST",
            "of_subject",
            Node::new("TEST", "diagnosis"),
            Node::new("TEST", "subject"),
        ));
        let ent_c = entity_to_gnode(&mut ctx, &edge);
        let clause = generate_match_clause(&mut ctx, &edge, &ent_c).unwrap();
        let text = clause.render();
        assert_eq!(
            text,
            "MATCH (n0:relationship {handle:'of_subject',model:'TEST'})-[r0:has_src]->(n1:node {handle:'diagnosis',model:'TEST'}), (n0)-[r1:has_dst]->(n2:node {handle:'subject',model:'TEST'})"
        );
    }

    #[test]
    fn match_property_requires_parent_handle() {
        let mut ctx = BuilderContext::new();
        let mut prop = Property::new("", "nanoid");
        prop.parent_handle.clear();
        let entity = Entity::Property(prop);
        let ent_c = entity_to_gnode(&mut ctx, &entity);
        let err = generate_match_clause(&mut ctx, &entity, &ent_c).unwrap_err();
        assert!(matches!(err, CoreError::MissingParent { kind: "Property", .. }));
    }

    #[test]
    fn match_property_joins_parent_handle_triple() {
        let mut ctx = BuilderContext::new();
        let prop = Entity::Property(Property::new("subject", "nanoid"));
        let ent_c = entity_to_gnode(&mut ctx, &prop);
        let clause = generate_match_clause(&mut ctx, &prop, &ent_c).unwrap();
        assert_eq!(
            clause.render(),
            "MATCH (n1 {handle:'subject'})-[r0:has_property]->(n0:property {handle:'nanoid'})"
        );
    }

    #[test]
    fn match_tag_strips_parent_match_keyword() {
        let mut ctx = BuilderContext::new();
        let parent = Entity::Node(Node::new("TEST", "subject"));
        let tag = Entity::Tag(crate::metamodel::Tag::new("k", "v").with_parent(parent));
        let ent_c = entity_to_gnode(&mut ctx, &tag);
        let clause = generate_match_clause(&mut ctx, &tag, &ent_c).unwrap();
        assert!(clause.render().starts_with("MATCH (n1:node"));
        assert!(clause.render().contains("has_tag"));
    }
}
