//! Mapping synthesizer (§4.5): for each cross-model property-equivalence
//! pair named by a [`crate::mapping::doc::MappingDoc`], emit one compound
//! statement that links the two properties to a shared Concept tagged by
//! the mapping source.
//!
//! Grounded on `generate_mapping_cypher` in
//! `examples/original_source/src/make_mapping_changelog.py`: a MATCH of
//! both endpoint properties through their parents, two OPTIONAL MATCHes
//! probing for an already-tagged Concept, a WITH, and three FOREACH arms
//! each gated by a `CASE WHEN ... THEN [1] ELSE [] END` list-comprehension
//! guard - the property-graph idiom for a conditional write inside one
//! statement.

use indexmap::IndexMap;

use crate::cypher::clause::foreach;
use crate::cypher::{
    create, match_, merge, optional_match, with, BuilderContext, Clause, GNode, GRel, NodeSlot,
    Path, PropValue, Rendered, RelSlot, Statement, Triple,
};
use crate::mapping::doc::PropertyLink;

fn node(ctx: &mut BuilderContext, label: Option<&str>, pairs: &[(&str, PropValue)]) -> GNode {
    let mut props = IndexMap::new();
    for (k, v) in pairs {
        props.insert((*k).to_string(), v.clone());
    }
    GNode::new(ctx, label, props)
}

/// `(_ IN CASE WHEN <cond> THEN [1] ELSE [] END | <inner>)` as a single
/// FOREACH clause, carrying `inner`'s already-harvested parameters.
fn guarded_foreach(cond: &str, inner: &Clause) -> Clause {
    let text = format!("(_ IN CASE WHEN {cond} THEN [1] ELSE [] END | {})", inner.render());
    foreach(&[&Rendered::new(text, inner.params().clone())])
}

/// Builds the single compound statement linking `link`'s two properties,
/// stamping newly-created Concepts/Tags/relationships with `commit` when
/// supplied (§B.2 `_commit` convention).
pub fn link_statement(link: &PropertyLink, commit: Option<&str>) -> Statement {
    let mut ctx = BuilderContext::new();

    let src_prop_c = node(
        &mut ctx,
        Some("property"),
        &[("handle", PropValue::str(link.src_prop.clone())), ("model", PropValue::str(link.src_model.clone()))],
    );
    let dst_prop_c = node(
        &mut ctx,
        Some("property"),
        &[("handle", PropValue::str(link.dst_prop.clone())), ("model", PropValue::str(link.dst_model.clone()))],
    );
    let src_parent_c = node(
        &mut ctx,
        None,
        &[("handle", PropValue::str(link.src_parent.clone())), ("model", PropValue::str(link.src_model.clone()))],
    );
    let dst_parent_c = node(
        &mut ctx,
        None,
        &[("handle", PropValue::str(link.dst_parent.clone())), ("model", PropValue::str(link.dst_model.clone()))],
    );

    let has_property_src = GRel::new(&mut ctx, Some("has_property"), IndexMap::new());
    let has_property_dst = GRel::new(&mut ctx, Some("has_property"), IndexMap::new());
    let src_triple = Triple::new(NodeSlot::Full(src_parent_c), RelSlot::Anon(has_property_src), NodeSlot::Full(src_prop_c.clone()));
    let dst_triple = Triple::new(NodeSlot::Full(dst_parent_c), RelSlot::Anon(has_property_dst), NodeSlot::Full(dst_prop_c.clone()));
    let match_clause = match_(&[&src_triple, &dst_triple]);

    // Probe whether either endpoint already carries a Concept tagged by
    // this mapping's source model.
    let src_concept_c = GNode::new(&mut ctx, Some("concept"), IndexMap::new());
    let dst_concept_c = GNode::new(&mut ctx, Some("concept"), IndexMap::new());
    let tag_props = |model: &str| {
        let mut m = IndexMap::new();
        m.insert("key".to_string(), PropValue::str("mapping_source"));
        m.insert("value".to_string(), PropValue::str(model.to_string()));
        m
    };

    let src_has_concept = GRel::new(&mut ctx, Some("has_concept"), IndexMap::new());
    let src_has_tag = GRel::new(&mut ctx, Some("has_tag"), IndexMap::new());
    let src_tag_c = GNode::new(&mut ctx, Some("tag"), tag_props(&link.src_model));
    let src_concept_path = Path::new(vec![
        Triple::new(NodeSlot::PlainVar(src_prop_c.clone()), RelSlot::Anon(src_has_concept), NodeSlot::Full(src_concept_c.clone())),
        Triple::new(NodeSlot::PlainVar(src_concept_c.clone()), RelSlot::Anon(src_has_tag), NodeSlot::Full(src_tag_c)),
    ]);

    let dst_has_concept = GRel::new(&mut ctx, Some("has_concept"), IndexMap::new());
    let dst_has_tag = GRel::new(&mut ctx, Some("has_tag"), IndexMap::new());
    let dst_tag_c = GNode::new(&mut ctx, Some("tag"), tag_props(&link.src_model));
    let dst_concept_path = Path::new(vec![
        Triple::new(NodeSlot::PlainVar(dst_prop_c.clone()), RelSlot::Anon(dst_has_concept), NodeSlot::Full(dst_concept_c.clone())),
        Triple::new(NodeSlot::PlainVar(dst_concept_c.clone()), RelSlot::Anon(dst_has_tag), NodeSlot::Full(dst_tag_c)),
    ]);

    let opt_src = optional_match(&[&src_concept_path]);
    let opt_dst = optional_match(&[&dst_concept_path]);

    let with_clause = with(&[
        &NodeSlot::Var(src_prop_c.clone()),
        &NodeSlot::Var(dst_prop_c.clone()),
        &NodeSlot::Var(src_concept_c.clone()),
        &NodeSlot::Var(dst_concept_c.clone()),
    ]);

    let src_var = src_concept_c.var();
    let dst_var = dst_concept_c.var();

    // Arm 1: src has a tagged concept, dst doesn't -> link dst to it.
    let link_rel_1 = GRel::new(&mut ctx, Some("has_concept"), IndexMap::new());
    let merge_dst_to_src = merge(&[&Triple::new(
        NodeSlot::PlainVar(dst_prop_c.clone()),
        RelSlot::Anon(link_rel_1),
        NodeSlot::PlainVar(src_concept_c.clone()),
    )]);
    let arm1 = guarded_foreach(&format!("{src_var} IS NOT NULL AND {dst_var} IS NULL"), &merge_dst_to_src);

    // Arm 2: mirror image - dst has a tagged concept, src doesn't.
    let link_rel_2 = GRel::new(&mut ctx, Some("has_concept"), IndexMap::new());
    let merge_src_to_dst = merge(&[&Triple::new(
        NodeSlot::PlainVar(src_prop_c.clone()),
        RelSlot::Anon(link_rel_2),
        NodeSlot::PlainVar(dst_concept_c.clone()),
    )]);
    let arm2 = guarded_foreach(&format!("{src_var} IS NULL AND {dst_var} IS NOT NULL"), &merge_src_to_dst);

    // Arm 3: neither has one - create a fresh Concept, tag it, link both.
    let mut new_concept_props = IndexMap::new();
    let mut new_tag_props = tag_props(&link.src_model);
    let mut link_props = IndexMap::new();
    if let Some(c) = commit {
        new_concept_props.insert("_commit".to_string(), PropValue::str(c.to_string()));
        new_tag_props.insert("_commit".to_string(), PropValue::str(c.to_string()));
        link_props.insert("_commit".to_string(), PropValue::str(c.to_string()));
    }
    let new_concept_c = GNode::new(&mut ctx, Some("concept"), new_concept_props);
    let new_tag_c = GNode::new(&mut ctx, Some("tag"), new_tag_props);
    let has_tag_new = GRel::new(&mut ctx, Some("has_tag"), IndexMap::new());
    let create_concept = create(&[&Triple::new(
        NodeSlot::Full(new_concept_c.clone()),
        RelSlot::Full(has_tag_new),
        NodeSlot::Full(new_tag_c),
    )]);
    let rel_src_new = GRel::new(&mut ctx, Some("has_concept"), link_props.clone());
    let create_src_link = create(&[&Triple::new(
        NodeSlot::PlainVar(src_prop_c),
        RelSlot::Full(rel_src_new),
        NodeSlot::PlainVar(new_concept_c.clone()),
    )]);
    let rel_dst_new = GRel::new(&mut ctx, Some("has_concept"), link_props);
    let create_dst_link = create(&[&Triple::new(
        NodeSlot::PlainVar(dst_prop_c),
        RelSlot::Full(rel_dst_new),
        NodeSlot::PlainVar(new_concept_c),
    )]);
    let arm3_text = format!(
        "{} {} {}",
        create_concept.render(),
        create_src_link.render(),
        create_dst_link.render()
    );
    let mut arm3_params = create_concept.params().clone();
    arm3_params.extend(create_src_link.params().clone());
    arm3_params.extend(create_dst_link.params().clone());
    let arm3 = foreach(&[&Rendered::new(
        format!("(_ IN CASE WHEN {src_var} IS NULL AND {dst_var} IS NULL THEN [1] ELSE [] END | {arm3_text})"),
        arm3_params,
    )]);

    Statement::new(vec![match_clause, opt_src, opt_dst, with_clause, arm1, arm2, arm3]).terminated()
}

/// Builds one statement per [`PropertyLink`] in `links`, in order - the
/// shape [`crate::changelog::build_mapping_changelog`] expects.
pub fn link_statements(links: &[PropertyLink], commit: Option<&str>) -> Vec<Statement> {
    links.iter().map(|link| link_statement(link, commit)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> PropertyLink {
        PropertyLink {
            src_model: "M1".to_string(),
            src_parent: "a".to_string(),
            src_prop: "p_src".to_string(),
            dst_model: "M2".to_string(),
            dst_parent: "b".to_string(),
            dst_prop: "p_dst".to_string(),
        }
    }

    #[test]
    fn statement_has_match_two_optional_matches_with_and_three_foreach_arms() {
        let stmt = link_statement(&link(), None);
        let text = stmt.render();
        assert!(text.starts_with("MATCH"));
        assert_eq!(text.matches("OPTIONAL MATCH").count(), 2);
        assert_eq!(text.matches(" WITH ").count(), 1);
        assert_eq!(text.matches("FOREACH").count(), 3);
        assert_eq!(text.matches("CASE WHEN").count(), 3);
        assert!(text.contains("mapping_source"));
    }

    #[test]
    fn commit_stamps_the_new_concept_tag_and_both_links() {
        let stmt = link_statement(&link(), Some("_COMMIT_123"));
        let text = stmt.render();
        assert_eq!(text.matches("_commit:'_COMMIT_123'").count(), 3);
    }

    #[test]
    fn link_statements_preserves_order() {
        let links = vec![link(), link()];
        let stmts = link_statements(&links, None);
        assert_eq!(stmts.len(), 2);
    }
}
