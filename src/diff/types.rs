//! The shape of a semantic diff between two model versions, as consumed
//! by [`crate::diff::splitter::DiffSplitter`].
//!
//! An external collaborator (the "diff two models" routine, out of
//! scope here) is responsible for comparing two [`crate::metamodel::Model`]s
//! and producing this structure. Keys mirror the reference's natural keys
//! per entity kind: a Node is keyed by its bare handle (the model handle
//! is supplied once, to the splitter, not per-key); an Edge by
//! `(handle, src_handle, dst_handle)`; a Property or Term by a 2-tuple.

use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult};
use crate::metamodel::{Edge, Entity, Node, Property, Term};

pub type NodeKey = String;
pub type EdgeKey = (String, String, String);
pub type PropKey = (String, String);
pub type TermKey = (String, String);

/// Reconstructs an entity shell for a *changed* diff entry from its bare
/// key, the way `generate_entity_from_key` does in the reference: a
/// `changed` record only carries per-attribute deltas, not a full entity,
/// so the splitter needs to rebuild just enough of the entity (its label
/// and identifying attrs) to produce a MATCH pattern for it.
///
/// `kind` must be one of `"nodes"`, `"edges"`, `"props"`, `"terms"` -
/// anything else is [`CoreError::UnknownEntityType`]. Key arity is
/// validated through [`edge_key_from_parts`]/[`prop_key_from_parts`]/
/// [`term_key_from_parts`], surfacing [`CoreError::MalformedKey`] the same
/// way those do.
pub fn entity_from_key(kind: &str, key_parts: &[String], model_handle: &str) -> CoreResult<Entity> {
    match kind {
        "nodes" => {
            let handle = key_parts.first().ok_or(CoreError::MalformedKey {
                kind: "Node",
                expected: 1,
                got: key_parts.len(),
            })?;
            Ok(Entity::Node(Node::new(model_handle, handle.clone())))
        }
        "edges" => {
            let (handle, src, dst) = edge_key_from_parts(key_parts)?;
            Ok(Entity::Edge(Edge::new(
                model_handle,
                handle,
                Node::new(model_handle, src),
                Node::new(model_handle, dst),
            )))
        }
        "props" => {
            let (parent_handle, handle) = prop_key_from_parts(key_parts)?;
            Ok(Entity::Property(Property::new(parent_handle, handle)))
        }
        "terms" => {
            let (value, origin_name) = term_key_from_parts(key_parts)?;
            Ok(Entity::Term(Term::new(value, origin_name)))
        }
        other => Err(CoreError::UnknownEntityType(other.to_string())),
    }
}

/// Validates and assembles an Edge key from loosely-typed external input
/// (e.g. a JSON array). Mirrors the reference's key-arity check, which
/// only fires for Edge, Property, and Term keys.
pub fn edge_key_from_parts(parts: &[String]) -> CoreResult<EdgeKey> {
    if parts.len() != 3 {
        return Err(CoreError::MalformedKey {
            kind: "Edge",
            expected: 3,
            got: parts.len(),
        });
    }
    Ok((parts[0].clone(), parts[1].clone(), parts[2].clone()))
}

pub fn prop_key_from_parts(parts: &[String]) -> CoreResult<PropKey> {
    if parts.len() != 2 {
        return Err(CoreError::MalformedKey {
            kind: "Property",
            expected: 2,
            got: parts.len(),
        });
    }
    Ok((parts[0].clone(), parts[1].clone()))
}

pub fn term_key_from_parts(parts: &[String]) -> CoreResult<TermKey> {
    if parts.len() != 2 {
        return Err(CoreError::MalformedKey {
            kind: "Term",
            expected: 2,
            got: parts.len(),
        });
    }
    Ok((parts[0].clone(), parts[1].clone()))
}

/// A single attribute's change on a changed entity.
#[derive(Debug, Clone)]
pub enum AttrChange {
    /// A scalar attribute: `(old, new)`, with either side possibly absent.
    Simple {
        old: Option<crate::cypher::PropValue>,
        new: Option<crate::cypher::PropValue>,
    },
    /// An object attribute (concept or value_set): the container entity
    /// as it exists in the post-change state, plus the Terms removed
    /// from and added to it.
    Object {
        container: Entity,
        removed: Vec<Entity>,
        added: Vec<Entity>,
    },
    /// A collection attribute (props/tags/terms of an object): members
    /// removed from and added to it.
    Collection { removed: Vec<Entity>, added: Vec<Entity> },
}

/// One entity's full set of attribute changes, plus an entity shell
/// sufficient to build its MATCH pattern.
#[derive(Debug, Clone)]
pub struct ChangedEntity {
    pub entity: Entity,
    pub attrs: IndexMap<String, AttrChange>,
}

/// Removed/added/changed sub-maps for one entity kind.
#[derive(Debug, Clone, Default)]
pub struct EntityDiff<K: Eq + std::hash::Hash> {
    pub removed: IndexMap<K, Entity>,
    pub added: IndexMap<K, Entity>,
    pub changed: IndexMap<K, ChangedEntity>,
}

impl<K: Eq + std::hash::Hash> EntityDiff<K> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.changed.is_empty()
    }
}

/// A semantic diff keyed by entity kind. The optional `summary` key some
/// producers attach is informational only and is never read by the
/// splitter.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub terms: EntityDiff<TermKey>,
    pub props: EntityDiff<PropKey>,
    pub edges: EntityDiff<EdgeKey>,
    pub nodes: EntityDiff<NodeKey>,
    pub summary: Option<String>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the informational summary key, matching the reference's
    /// normalization step before processing.
    pub fn take_summary(&mut self) -> Option<String> {
        self.summary.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_reconstructs_a_node_shell() {
        let entity = entity_from_key("nodes", &["subject".to_string()], "TEST").unwrap();
        assert!(matches!(entity, Entity::Node(n) if n.handle == "subject" && n.model == "TEST"));
    }

    #[test]
    fn edge_key_reconstructs_src_and_dst_nodes() {
        let parts = vec!["of_subject".to_string(), "diagnosis".to_string(), "subject".to_string()];
        let entity = entity_from_key("edges", &parts, "TEST").unwrap();
        match entity {
            Entity::Edge(e) => {
                assert_eq!(e.handle, "of_subject");
                assert_eq!(e.src.handle, "diagnosis");
                assert_eq!(e.dst.handle, "subject");
            }
            _ => panic!("expected Edge"),
        }
    }

    #[test]
    fn malformed_edge_key_is_fatal() {
        let err = entity_from_key("edges", &["only_one".to_string()], "TEST").unwrap_err();
        assert!(matches!(err, CoreError::MalformedKey { kind: "Edge", expected: 3, got: 1 }));
    }

    #[test]
    fn prop_key_sets_parent_handle() {
        let parts = vec!["subject".to_string(), "nanoid".to_string()];
        let entity = entity_from_key("props", &parts, "TEST").unwrap();
        match entity {
            Entity::Property(p) => {
                assert_eq!(p.parent_handle, "subject");
                assert_eq!(p.handle, "nanoid");
            }
            _ => panic!("expected Property"),
        }
    }

    #[test]
    fn term_key_builds_value_and_origin() {
        let parts = vec!["Lung".to_string(), "NCIt".to_string()];
        let entity = entity_from_key("terms", &parts, "TEST").unwrap();
        match entity {
            Entity::Term(t) => {
                assert_eq!(t.value, "Lung");
                assert_eq!(t.origin_name, "NCIt");
            }
            _ => panic!("expected Term"),
        }
    }

    #[test]
    fn unknown_kind_is_unknown_entity_type() {
        let err = entity_from_key("value_set", &["x".to_string()], "TEST").unwrap_err();
        assert!(matches!(err, CoreError::UnknownEntityType(k) if k == "value_set"));
    }
}
