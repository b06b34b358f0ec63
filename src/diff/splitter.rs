//! Diff-splitter state machine: decomposes a semantic diff between two
//! model versions into atomic (forward, rollback) Cypher statement
//! pairs, respecting dependency ordering between entity kinds and
//! between statement buckets.

use indexmap::IndexMap;

use crate::cypher::{
    assignment_expr, delete, detach_delete, match_, merge, remove, removal_expr, set_,
    BuilderContext, GNode, GRel, NodeSlot, PropValue, RelSlot, Statement, Triple,
};
use crate::diff::types::{AttrChange, ChangedEntity, Diff};
use crate::error::{CoreError, CoreResult};
use crate::match_clause::{entity_to_gnode, generate_match_clause};
use crate::metamodel::Entity;

#[derive(Default)]
struct Bucket {
    statements: Vec<Statement>,
    rollbacks: Vec<Statement>,
}

impl Bucket {
    fn push(&mut self, stmt: Statement, rollback: Statement) {
        self.statements.push(stmt);
        self.rollbacks.push(rollback);
    }
}

#[derive(Default)]
struct SixBuckets {
    remove_node: Bucket,
    add_node: Bucket,
    remove_property: Bucket,
    add_property: Bucket,
    remove_relationship: Bucket,
    add_relationship: Bucket,
}

/// Splits a [`Diff`] into ordered (forward, rollback) statement pairs.
///
/// `model_handle` fills in the `model` scalar attribute for Node keys,
/// which (unlike Edge/Property/Term keys) carry only a bare handle - the
/// model they belong to is understood from context, not re-stated per key.
pub struct DiffSplitter {
    model_handle: String,
    ctx: BuilderContext,
    buckets: SixBuckets,
}

impl DiffSplitter {
    pub fn new(model_handle: impl Into<String>) -> Self {
        DiffSplitter {
            model_handle: model_handle.into(),
            ctx: BuilderContext::new(),
            buckets: SixBuckets::default(),
        }
    }

    /// Drains the six buckets in their fixed emission order: REMOVE_NODE,
    /// ADD_NODE, REMOVE_PROPERTY, ADD_PROPERTY, REMOVE_RELATIONSHIP,
    /// ADD_RELATIONSHIP.
    pub fn get_diff_statements(&mut self, diff: &mut Diff) -> CoreResult<Vec<(Statement, Statement)>> {
        diff.take_summary();

        // Fixed kind order: later kinds may depend on earlier ones during
        // rollback (removing an Edge whose endpoints were also removed
        // must happen before those endpoint removals roll back).
        for entity in diff.terms.removed.values() {
            self.remove_entity(entity)?;
        }
        for entity in diff.terms.added.values() {
            self.add_entity(entity)?;
        }
        for ce in diff.terms.changed.values() {
            self.process_changed_entity(ce)?;
        }

        for entity in diff.props.removed.values() {
            self.remove_entity(entity)?;
        }
        for entity in diff.props.added.values() {
            self.add_entity(entity)?;
        }
        for ce in diff.props.changed.values() {
            self.process_changed_entity(ce)?;
        }

        for entity in diff.edges.removed.values() {
            self.remove_entity(entity)?;
        }
        for entity in diff.edges.added.values() {
            self.add_entity(entity)?;
            self.add_edge_endpoints(entity)?;
        }
        for ce in diff.edges.changed.values() {
            self.process_changed_entity(ce)?;
        }

        for entity in diff.nodes.removed.values() {
            self.remove_entity(entity)?;
        }
        for entity in diff.nodes.added.values() {
            self.add_entity(entity)?;
        }
        for ce in diff.nodes.changed.values() {
            self.process_changed_entity(ce)?;
        }

        Ok(self.drain())
    }

    fn drain(&mut self) -> Vec<(Statement, Statement)> {
        let mut out = Vec::new();
        for bucket in [
            &mut self.buckets.remove_node,
            &mut self.buckets.add_node,
            &mut self.buckets.remove_property,
            &mut self.buckets.add_property,
            &mut self.buckets.remove_relationship,
            &mut self.buckets.add_relationship,
        ] {
            out.extend(bucket.statements.drain(..).zip(bucket.rollbacks.drain(..)));
        }
        out
    }

    // -- removed/added entities -------------------------------------------------

    fn remove_entity(&mut self, entity: &Entity) -> CoreResult<()> {
        let (fwd, rollback) = self.remove_node_statement(entity)?;
        self.buckets.remove_node.push(fwd, rollback);
        Ok(())
    }

    fn add_entity(&mut self, entity: &Entity) -> CoreResult<()> {
        let (fwd, rollback) = self.add_node_statement(entity)?;
        self.buckets.add_node.push(fwd, rollback);
        Ok(())
    }

    fn add_edge_endpoints(&mut self, edge: &Entity) -> CoreResult<()> {
        if let Entity::Edge(e) = edge {
            let src = Entity::Node((*e.src).clone());
            let dst = Entity::Node((*e.dst).clone());
            let (fwd, rollback) = self.add_relationship_statement(edge, "has_src", &src);
            self.buckets.add_relationship.push(fwd, rollback);
            let (fwd, rollback) = self.add_relationship_statement(edge, "has_dst", &dst);
            self.buckets.add_relationship.push(fwd, rollback);
        }
        Ok(())
    }

    fn remove_node_statement(&mut self, entity: &Entity) -> CoreResult<(Statement, Statement)> {
        self.ctx.reset();
        let ent_c = entity_to_gnode(&mut self.ctx, entity);
        let match_clause = generate_match_clause(&mut self.ctx, entity, &ent_c)?;
        let fwd = Statement::new(vec![match_clause, detach_delete(&[&NodeSlot::Var(ent_c.clone())])]).terminated();
        let rollback = Statement::new(vec![merge(&[&NodeSlot::Full(ent_c)])]).terminated();
        Ok((fwd, rollback))
    }

    fn add_node_statement(&mut self, entity: &Entity) -> CoreResult<(Statement, Statement)> {
        self.ctx.reset();
        let ent_c = entity_to_gnode(&mut self.ctx, entity);
        let fwd = Statement::new(vec![merge(&[&NodeSlot::Full(ent_c.clone())])]).terminated();
        let match_clause = generate_match_clause(&mut self.ctx, entity, &ent_c)?;
        let rollback = Statement::new(vec![match_clause, detach_delete(&[&NodeSlot::Var(ent_c)])]).terminated();
        Ok((fwd, rollback))
    }

    // -- relationship add/remove (both sides already matched in full) -----------

    /// Forward: MATCH both sides, MERGE the relationship between their
    /// plain-var occurrences. Rollback detach-deletes the dst node
    /// entirely rather than just the relationship - preserved verbatim
    /// from the reference, which makes the same asymmetric choice.
    fn add_relationship_statement(&mut self, src: &Entity, rel_name: &str, dst: &Entity) -> (Statement, Statement) {
        self.ctx.reset();
        let src_c = entity_to_gnode(&mut self.ctx, src);
        let dst_c = entity_to_gnode(&mut self.ctx, dst);
        let rel = GRel::new(&mut self.ctx, Some(rel_name), IndexMap::new());

        let fwd = Statement::new(vec![
            match_(&[&NodeSlot::Full(src_c.clone()), &NodeSlot::Full(dst_c.clone())]),
            merge(&[&Triple::new(
                NodeSlot::PlainVar(src_c.clone()),
                RelSlot::Full(rel.clone()),
                NodeSlot::PlainVar(dst_c.clone()),
            )]),
        ])
        .terminated();

        let rollback = Statement::new(vec![
            match_(&[&Triple::new(
                NodeSlot::Full(src_c),
                RelSlot::Full(rel),
                NodeSlot::Full(dst_c.clone()),
            )]),
            detach_delete(&[&NodeSlot::Var(dst_c)]),
        ])
        .terminated();

        (fwd, rollback)
    }

    /// Mirror image of [`Self::add_relationship_statement`]: forward
    /// detach-deletes the dst node, rollback re-merges it.
    fn remove_relationship_statement(&mut self, src: &Entity, rel_name: &str, dst: &Entity) -> (Statement, Statement) {
        self.ctx.reset();
        let src_c = entity_to_gnode(&mut self.ctx, src);
        let dst_c = entity_to_gnode(&mut self.ctx, dst);
        let rel = GRel::new(&mut self.ctx, Some(rel_name), IndexMap::new());

        let trip = Triple::new(
            NodeSlot::Full(src_c.clone()),
            RelSlot::Full(rel.clone()),
            NodeSlot::Full(dst_c.clone()),
        );
        let fwd = Statement::new(vec![match_(&[&trip]), detach_delete(&[&NodeSlot::Var(dst_c.clone())])]).terminated();

        let rollback = Statement::new(vec![
            match_(&[&NodeSlot::Full(src_c.clone()), &NodeSlot::Full(dst_c.clone())]),
            merge(&[&Triple::new(NodeSlot::PlainVar(src_c), RelSlot::Full(rel), NodeSlot::PlainVar(dst_c))]),
        ])
        .terminated();

        (fwd, rollback)
    }

    // -- long-relationship nuance (§4.4.3) ---------------------------------------

    /// The inner (term) relationship plus, for the addition side of the
    /// dst-side sub-case, an auxiliary statement ensuring
    /// `(parent)-[parent_rel]->(container)` exists.
    fn long_relationship_pair(
        &mut self,
        parent: &Entity,
        parent_rel: &str,
        container: &Entity,
        term: &Entity,
        term_rel: &str,
        container_is_dst: bool,
        adding: bool,
    ) -> (Statement, Statement) {
        self.ctx.reset();
        let parent_c = entity_to_gnode(&mut self.ctx, parent);
        let container_c = entity_to_gnode(&mut self.ctx, container);
        let term_c = entity_to_gnode(&mut self.ctx, term);
        let parent_rel_g = GRel::new(&mut self.ctx, Some(parent_rel), IndexMap::new());
        let term_rel_g = GRel::new(&mut self.ctx, Some(term_rel), IndexMap::new());

        let parent_path = Triple::new(
            NodeSlot::Full(parent_c.clone()),
            RelSlot::Full(parent_rel_g),
            NodeSlot::Full(container_c.clone()),
        );

        let full_inner = if container_is_dst {
            Triple::new(
                NodeSlot::Full(term_c.clone()),
                RelSlot::Full(term_rel_g.clone()),
                NodeSlot::Full(container_c.clone()),
            )
        } else {
            Triple::new(
                NodeSlot::Full(container_c.clone()),
                RelSlot::Full(term_rel_g.clone()),
                NodeSlot::Full(term_c.clone()),
            )
        };
        let plain_inner = if container_is_dst {
            Triple::new(
                NodeSlot::PlainVar(term_c.clone()),
                RelSlot::Full(term_rel_g.clone()),
                NodeSlot::PlainVar(container_c.clone()),
            )
        } else {
            Triple::new(
                NodeSlot::PlainVar(container_c.clone()),
                RelSlot::Full(term_rel_g.clone()),
                NodeSlot::PlainVar(term_c.clone()),
            )
        };

        if adding {
            let fwd = Statement::new(vec![
                match_(&[&parent_path, &NodeSlot::Full(term_c.clone())]),
                merge(&[&plain_inner]),
            ])
            .terminated();
            let rollback =
                Statement::new(vec![match_(&[&full_inner]), delete(&[&RelSlot::Var(term_rel_g)])]).terminated();
            (fwd, rollback)
        } else {
            let fwd =
                Statement::new(vec![match_(&[&full_inner]), delete(&[&RelSlot::Var(term_rel_g.clone())])]).terminated();
            let rollback = Statement::new(vec![
                match_(&[&parent_path, &NodeSlot::Full(term_c.clone())]),
                merge(&[&plain_inner]),
            ])
            .terminated();
            (fwd, rollback)
        }
    }

    fn add_long_relationship(
        &mut self,
        parent: &Entity,
        parent_rel: &str,
        container: &Entity,
        term: &Entity,
        term_rel: &str,
        container_is_dst: bool,
    ) -> Vec<(Statement, Statement)> {
        let mut out = vec![self.long_relationship_pair(parent, parent_rel, container, term, term_rel, container_is_dst, true)];
        if container_is_dst {
            out.push(self.add_relationship_statement(parent, parent_rel, container));
        }
        out
    }

    fn remove_long_relationship(
        &mut self,
        parent: &Entity,
        parent_rel: &str,
        container: &Entity,
        term: &Entity,
        term_rel: &str,
        container_is_dst: bool,
    ) -> Vec<(Statement, Statement)> {
        vec![self.long_relationship_pair(parent, parent_rel, container, term, term_rel, container_is_dst, false)]
    }

    // -- changed entities ---------------------------------------------------------

    fn process_changed_entity(&mut self, ce: &ChangedEntity) -> CoreResult<()> {
        for (attr, change) in &ce.attrs {
            match change {
                AttrChange::Simple { old, new } => {
                    let (fwd, rollback) = self.simple_attr_statements(&ce.entity, attr, old, new)?;
                    if new.is_none() {
                        self.buckets.remove_property.push(fwd, rollback);
                    } else {
                        self.buckets.add_property.push(fwd, rollback);
                    }
                }
                AttrChange::Object { container, removed, added } => {
                    self.process_object_change(&ce.entity, attr, container, removed, added)?;
                }
                AttrChange::Collection { removed, added } => {
                    self.process_collection_change(&ce.entity, attr, removed, added)?;
                }
            }
        }
        Ok(())
    }

    /// Builds the shared MATCH pattern for a simple-attribute change: the
    /// entity's full disambiguating pattern (§4.2 `generate_match_clause`,
    /// not a flat `MATCH (entity)`) - for an Edge this is the src/dst
    /// pattern, for a Property the parent-scoped triple, for a Tag the
    /// spliced parent match - built with the changing key excluded from
    /// the entity's own attribute map so the pattern never depends on the
    /// value being replaced (§4.4.4).
    fn simple_attr_statements(
        &mut self,
        entity: &Entity,
        key: &str,
        old: &Option<PropValue>,
        new: &Option<PropValue>,
    ) -> CoreResult<(Statement, Statement)> {
        self.ctx.reset();
        let mut attrs = entity.attr_dict();
        attrs.shift_remove(key);
        let ent_c = GNode::new(&mut self.ctx, Some(entity.label()), attrs);
        let match_clause = generate_match_clause(&mut self.ctx, entity, &ent_c)?;
        let var = ent_c.var();

        let pair = match (old, new) {
            (Some(old_v), None) => {
                let fwd = Statement::new(vec![match_clause.clone(), remove(&[&removal_expr(&var, key)])]).terminated();
                let rollback =
                    Statement::new(vec![match_clause, set_(&[&assignment_expr(&var, key, old_v)])]).terminated();
                (fwd, rollback)
            }
            (None, Some(new_v)) => {
                let fwd =
                    Statement::new(vec![match_clause.clone(), set_(&[&assignment_expr(&var, key, new_v)])]).terminated();
                let rollback = Statement::new(vec![match_clause, remove(&[&removal_expr(&var, key)])]).terminated();
                (fwd, rollback)
            }
            (Some(old_v), Some(new_v)) => {
                let fwd =
                    Statement::new(vec![match_clause.clone(), set_(&[&assignment_expr(&var, key, new_v)])]).terminated();
                let rollback =
                    Statement::new(vec![match_clause, set_(&[&assignment_expr(&var, key, old_v)])]).terminated();
                (fwd, rollback)
            }
            (None, None) => {
                let fwd = Statement::new(vec![match_clause.clone()]).terminated();
                let rollback = Statement::new(vec![match_clause]).terminated();
                (fwd, rollback)
            }
        };
        Ok(pair)
    }

    fn process_object_change(
        &mut self,
        entity: &Entity,
        attr: &str,
        container: &Entity,
        removed_terms: &[Entity],
        added_terms: &[Entity],
    ) -> CoreResult<()> {
        let spec = entity.relspec(attr).ok_or_else(|| CoreError::UnknownAttribute {
            entity: entity.label().to_string(),
            attr: attr.to_string(),
        })?;

        if removed_terms.is_empty() && !added_terms.is_empty() {
            let (fwd, rollback) = if spec.entity_to_value {
                self.add_relationship_statement(entity, spec.rel_name, container)
            } else {
                self.add_relationship_statement(container, spec.rel_name, entity)
            };
            self.buckets.add_relationship.push(fwd, rollback);
        }

        let term_spec = container.relspec("terms").ok_or_else(|| CoreError::UnknownAttribute {
            entity: container.label().to_string(),
            attr: "terms".to_string(),
        })?;
        let container_is_dst = !term_spec.entity_to_value;

        for term in removed_terms {
            for (fwd, rollback) in
                self.remove_long_relationship(entity, spec.rel_name, container, term, term_spec.rel_name, container_is_dst)
            {
                self.buckets.remove_relationship.push(fwd, rollback);
            }
        }
        for term in added_terms {
            for (fwd, rollback) in
                self.add_long_relationship(entity, spec.rel_name, container, term, term_spec.rel_name, container_is_dst)
            {
                self.buckets.add_relationship.push(fwd, rollback);
            }
        }
        Ok(())
    }

    fn process_collection_change(
        &mut self,
        entity: &Entity,
        attr: &str,
        removed: &[Entity],
        added: &[Entity],
    ) -> CoreResult<()> {
        let spec = entity.relspec(attr);

        for member in removed {
            if let Entity::Tag(t) = member {
                let mut t = t.clone();
                t.parent = Some(Box::new(entity.clone()));
                let (fwd, rollback) = self.remove_node_statement(&Entity::Tag(t))?;
                self.buckets.remove_node.push(fwd, rollback);
            } else {
                let spec = spec.ok_or_else(|| CoreError::UnknownAttribute {
                    entity: entity.label().to_string(),
                    attr: attr.to_string(),
                })?;
                let (fwd, rollback) = if spec.entity_to_value {
                    self.remove_relationship_statement(entity, spec.rel_name, member)
                } else {
                    self.remove_relationship_statement(member, spec.rel_name, entity)
                };
                self.buckets.remove_relationship.push(fwd, rollback);
            }
        }

        for member in added {
            if let Entity::Tag(t) = member {
                let mut t = t.clone();
                t.parent = Some(Box::new(entity.clone()));
                let (fwd, rollback) = self.add_node_statement(&Entity::Tag(t))?;
                self.buckets.add_node.push(fwd, rollback);
            } else {
                let spec = spec.ok_or_else(|| CoreError::UnknownAttribute {
                    entity: entity.label().to_string(),
                    attr: attr.to_string(),
                })?;
                let (fwd, rollback) = if spec.entity_to_value {
                    self.add_relationship_statement(entity, spec.rel_name, member)
                } else {
                    self.add_relationship_statement(member, spec.rel_name, entity)
                };
                self.buckets.add_relationship.push(fwd, rollback);
            }
        }
        Ok(())
    }

    /// Fills in the `model` attribute a Node key alone can't carry.
    pub fn model_handle(&self) -> &str {
        &self.model_handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher::PropValue;
    use crate::metamodel::{Edge, Node};

    fn node(handle: &str) -> Entity {
        Entity::Node(Node::new("TEST", handle))
    }

    #[test]
    fn simple_attr_add_matches_seed_scenario_one() {
        let mut splitter = DiffSplitter::new("TEST");
        let mut diff = Diff::new();
        let ce = ChangedEntity {
            entity: node("subject"),
            attrs: {
                let mut m = IndexMap::new();
                m.insert(
                    "nanoid".to_string(),
                    AttrChange::Simple {
                        old: None,
                        new: Some(PropValue::str("def456")),
                    },
                );
                m
            },
        };
        diff.nodes.changed.insert("subject".to_string(), ce);
        let pairs = splitter.get_diff_statements(&mut diff).unwrap();
        assert_eq!(pairs.len(), 1);
        let (fwd, rollback) = &pairs[0];
        assert_eq!(
            fwd.render(),
            "MATCH (n0:node {handle:'subject',model:'TEST'}) SET n0.nanoid = 'def456';"
        );
        assert_eq!(
            rollback.render(),
            "MATCH (n0:node {handle:'subject',model:'TEST'}) REMOVE n0.nanoid;"
        );
    }

    #[test]
    fn added_edge_enqueues_src_and_dst_relationships() {
        let mut splitter = DiffSplitter::new("TEST");
        let mut diff = Diff::new();
        let edge = Edge::new("TEST", "of_subject", Node::new("TEST", "diagnosis"), Node::new("TEST", "subject"));
        diff.edges
            .added
            .insert(("of_subject".to_string(), "diagnosis".to_string(), "subject".to_string()), Entity::Edge(edge));
        let pairs = splitter.get_diff_statements(&mut diff).unwrap();
        // one ADD_NODE pair for the edge entity, two ADD_RELATIONSHIP pairs (has_src, has_dst).
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn edge_simple_attr_remove_matches_seed_scenario_two() {
        let mut splitter = DiffSplitter::new("TEST");
        let mut diff = Diff::new();
        let mut edge = Edge::new("TEST", "of_subject", Node::new("TEST", "diagnosis"), Node::new("TEST", "subject"));
        edge.attrs.insert("nanoid".to_string(), PropValue::str("abc123"));
        let ce = ChangedEntity {
            entity: Entity::Edge(edge),
            attrs: {
                let mut m = IndexMap::new();
                m.insert(
                    "nanoid".to_string(),
                    AttrChange::Simple {
                        old: Some(PropValue::str("abc123")),
                        new: None,
                    },
                );
                m
            },
        };
        diff.edges
            .changed
            .insert(("of_subject".to_string(), "diagnosis".to_string(), "subject".to_string()), ce);
        let pairs = splitter.get_diff_statements(&mut diff).unwrap();
        assert_eq!(pairs.len(), 1);
        let (fwd, rollback) = &pairs[0];
        let fwd_text = fwd.render();
        assert!(fwd_text.contains("(n0:relationship {handle:'of_subject',model:'TEST'})-[r0:has_src]->(n1:node {handle:'diagnosis',model:'TEST'})"));
        assert!(fwd_text.contains("(n0)-[r1:has_dst]->(n2:node {handle:'subject',model:'TEST'})"));
        assert!(fwd_text.ends_with("REMOVE n0.nanoid;"));
        assert!(rollback.render().ends_with("SET n0.nanoid = 'abc123';"));
    }

    #[test]
    fn bucket_order_is_remove_node_then_add_node_then_properties_then_relationships() {
        let mut splitter = DiffSplitter::new("TEST");
        let mut diff = Diff::new();
        diff.nodes.removed.insert("gone".to_string(), node("gone"));
        diff.nodes.added.insert("new".to_string(), node("new"));
        let pairs = splitter.get_diff_statements(&mut diff).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].0.render().starts_with("MATCH"));
        assert!(pairs[1].0.render().starts_with("MERGE"));
    }
}
