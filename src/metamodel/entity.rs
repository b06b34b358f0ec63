use indexmap::IndexMap;

use crate::cypher::PropValue;

/// How an entity's attribute is classified for diff-splitting purposes.
/// Replaces the reference's runtime `attspec_` reflection with a static
/// per-variant classification (see [`Entity::attr_kind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Simple,
    Object,
    Collection,
}

/// The resolved graph-relationship for an "object" or "collection"
/// attribute: a relationship type name plus a direction.
///
/// `entity_to_value = true` means `(entity)-[rel]->(value)`;
/// `entity_to_value = false` means `(value)-[rel]->(entity)`. This is the
/// boolean the `>` / no-marker distinction in `mapspec()["relationship"][attr]["rel"]`
/// collapses to: only an explicit `>` flips it to `true`; both a bare name
/// and a `<`-prefixed name resolve to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelSpec {
    pub rel_name: &'static str,
    pub entity_to_value: bool,
}

/// Key/value annotation attached to any entity; carries a snapshot of its
/// owner so match-path construction can walk "upward" without a cyclic
/// reference (the reference's `Tag._parent` back-pointer is an owned
/// clone here, never an aliasing reference).
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub key: String,
    pub value: String,
    pub attrs: IndexMap<String, PropValue>,
    pub parent: Option<Box<Entity>>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        let mut attrs = IndexMap::new();
        attrs.insert("key".to_string(), PropValue::str(key.clone()));
        attrs.insert("value".to_string(), PropValue::str(value.clone()));
        Tag {
            key,
            value,
            attrs,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: Entity) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

/// Provenance token attached to Terms/ValueSets.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub name: String,
    pub attrs: IndexMap<String, PropValue>,
}

impl Origin {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut attrs = IndexMap::new();
        attrs.insert("name".to_string(), PropValue::str(name.clone()));
        Origin { name, attrs }
    }
}

/// A controlled-vocabulary token, keyed by `(value, origin_name)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Term {
    pub value: String,
    pub origin_name: String,
    pub attrs: IndexMap<String, PropValue>,
    pub tags: IndexMap<String, Tag>,
    pub origin: Option<Origin>,
    pub concept: Option<Concept>,
    pub commit: Option<String>,
}

impl Term {
    pub fn new(value: impl Into<String>, origin_name: impl Into<String>) -> Self {
        let value = value.into();
        let origin_name = origin_name.into();
        let mut attrs = IndexMap::new();
        attrs.insert("value".to_string(), PropValue::str(value.clone()));
        attrs.insert("origin_name".to_string(), PropValue::str(origin_name.clone()));
        Term {
            value,
            origin_name,
            attrs,
            ..Default::default()
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.value.clone(), self.origin_name.clone())
    }
}

/// Unordered, keyless set of Terms attached to a Property - a ValueSet
/// has no identifying handle of its own; it is reached only by walking
/// `has_value_set` from its owning Property.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSet {
    pub attrs: IndexMap<String, PropValue>,
    pub tags: IndexMap<String, Tag>,
    pub origin: Option<Origin>,
    pub terms: IndexMap<(String, String), Term>,
    pub commit: Option<String>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Synonymy hub; carries a set of Terms (via `represents`) and Tags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Concept {
    pub handle: String,
    pub attrs: IndexMap<String, PropValue>,
    pub tags: IndexMap<String, Tag>,
    pub terms: IndexMap<(String, String), Term>,
}

impl Concept {
    pub fn new(handle: impl Into<String>) -> Self {
        let handle = handle.into();
        let mut attrs = IndexMap::new();
        attrs.insert("handle".to_string(), PropValue::str(handle.clone()));
        Concept {
            handle,
            attrs,
            ..Default::default()
        }
    }

    /// Injects the synthetic `mapping_source` tag used by full-model
    /// traversal before a Concept is emitted (see
    /// [`crate::mapper::full_model`]). Kept as a pure, non-mutating
    /// constructor rather than an in-place edit of the input model - the
    /// reference mutates the Concept it is handed; this clones first.
    pub fn tagged_with_mapping_source(&self, model_handle: &str) -> Concept {
        let mut c = self.clone();
        c.tags
            .insert("mapping_source".to_string(), Tag::new("mapping_source", model_handle));
        c
    }
}

/// Attribute belonging to a parent Node/Edge, keyed by `(parent_handle, handle)`.
/// `parent_handle` recovers its owner but - unlike the reference's
/// `_parent_handle`, which rides along inside the graph-bound property map
/// and must be explicitly popped before rendering - it is a dedicated Rust
/// field outside `attrs`, so it can never leak into an emitted pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Property {
    pub parent_handle: String,
    pub handle: String,
    pub attrs: IndexMap<String, PropValue>,
    pub tags: IndexMap<String, Tag>,
    pub concept: Option<Concept>,
    pub value_set: Option<ValueSet>,
    /// When an MDF loader assigns the same physical property definition to
    /// more than one parent, it stamps both occurrences with the same
    /// `shared_id`. [`crate::mapper::shared_props::separate_shared_props`]
    /// uses this to find sharing without relying on object identity/aliasing.
    pub shared_id: Option<String>,
}

impl Property {
    pub fn new(parent_handle: impl Into<String>, handle: impl Into<String>) -> Self {
        let parent_handle = parent_handle.into();
        let handle = handle.into();
        let mut attrs = IndexMap::new();
        attrs.insert("handle".to_string(), PropValue::str(handle.clone()));
        Property {
            parent_handle,
            handle,
            attrs,
            ..Default::default()
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.parent_handle.clone(), self.handle.clone())
    }
}

/// Labeled vertex kind, keyed by `(model, handle)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub model: String,
    pub handle: String,
    pub attrs: IndexMap<String, PropValue>,
    pub tags: IndexMap<String, Tag>,
    pub concept: Option<Concept>,
    pub props: IndexMap<String, Property>,
}

impl Node {
    pub fn new(model: impl Into<String>, handle: impl Into<String>) -> Self {
        let model = model.into();
        let handle = handle.into();
        let mut attrs = IndexMap::new();
        attrs.insert("handle".to_string(), PropValue::str(handle.clone()));
        attrs.insert("model".to_string(), PropValue::str(model.clone()));
        Node {
            model,
            handle,
            attrs,
            ..Default::default()
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.model.clone(), self.handle.clone())
    }
}

/// Relationship kind with a `src` Node and a `dst` Node, keyed by
/// `(handle, src.handle, dst.handle)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edge {
    pub model: String,
    pub handle: String,
    pub src: Box<Node>,
    pub dst: Box<Node>,
    pub attrs: IndexMap<String, PropValue>,
    pub tags: IndexMap<String, Tag>,
    pub concept: Option<Concept>,
    pub props: IndexMap<String, Property>,
}

impl Edge {
    pub fn new(model: impl Into<String>, handle: impl Into<String>, src: Node, dst: Node) -> Self {
        let model = model.into();
        let handle = handle.into();
        let mut attrs = IndexMap::new();
        attrs.insert("handle".to_string(), PropValue::str(handle.clone()));
        attrs.insert("model".to_string(), PropValue::str(model.clone()));
        Edge {
            model,
            handle,
            src: Box::new(src),
            dst: Box::new(dst),
            attrs,
            tags: IndexMap::new(),
            concept: None,
            props: IndexMap::new(),
        }
    }

    pub fn key(&self) -> (String, String, String) {
        (self.handle.clone(), self.src.handle.clone(), self.dst.handle.clone())
    }
}

/// A tagged-variant over every metamodel entity kind. Matching on this
/// enum is how the core replaces the reference's `isinstance` dispatch
/// throughout `generate_match_clause` and the mapper/splitter traversals.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(Node),
    Edge(Edge),
    Property(Property),
    Term(Term),
    ValueSet(ValueSet),
    Concept(Concept),
    Tag(Tag),
    Origin(Origin),
}

impl Entity {
    /// The graph label to use for this entity kind.
    pub fn label(&self) -> &'static str {
        match self {
            Entity::Node(_) => "node",
            Entity::Edge(_) => "relationship",
            Entity::Property(_) => "property",
            Entity::Term(_) => "term",
            Entity::ValueSet(_) => "value_set",
            Entity::Concept(_) => "concept",
            Entity::Tag(_) => "tag",
            Entity::Origin(_) => "origin",
        }
    }

    /// The persisted scalar attributes for this entity, in insertion
    /// order. Never includes `parent_handle` (Property) since that field
    /// lives outside `attrs` entirely.
    pub fn attr_dict(&self) -> IndexMap<String, PropValue> {
        match self {
            Entity::Node(n) => n.attrs.clone(),
            Entity::Edge(e) => e.attrs.clone(),
            Entity::Property(p) => p.attrs.clone(),
            Entity::Term(t) => t.attrs.clone(),
            Entity::ValueSet(v) => v.attrs.clone(),
            Entity::Concept(c) => c.attrs.clone(),
            Entity::Tag(t) => t.attrs.clone(),
            Entity::Origin(o) => o.attrs.clone(),
        }
    }

    /// Classifies an attribute name as simple/object/collection for this
    /// entity kind, or `None` if the entity has no such attribute.
    pub fn attr_kind(&self, attr: &str) -> Option<AttrKind> {
        use AttrKind::*;
        match self {
            Entity::Node(_) | Entity::Edge(_) => match attr {
                "tags" | "props" => Some(Collection),
                "concept" => Some(Object),
                _ => None,
            },
            Entity::Property(_) => match attr {
                "tags" => Some(Collection),
                "concept" | "value_set" => Some(Object),
                _ => None,
            },
            Entity::Term(_) => match attr {
                "tags" => Some(Collection),
                "origin" | "concept" => Some(Object),
                _ => None,
            },
            Entity::ValueSet(_) => match attr {
                "tags" | "terms" => Some(Collection),
                "origin" => Some(Object),
                _ => None,
            },
            Entity::Concept(_) => match attr {
                "tags" | "terms" => Some(Collection),
                _ => None,
            },
            Entity::Tag(_) | Entity::Origin(_) => None,
        }
    }

    /// The relationship name and direction for an "object"/"collection"
    /// attribute of this entity kind. Mirrors `mapspec()["relationship"]`
    /// from the reference, but as a static match instead of a reflective
    /// lookup table built at runtime.
    pub fn relspec(&self, attr: &str) -> Option<RelSpec> {
        match (self, attr) {
            (Entity::Node(_), "tags") | (Entity::Edge(_), "tags") => Some(RelSpec {
                rel_name: "has_tag",
                entity_to_value: true,
            }),
            (Entity::Node(_), "props") | (Entity::Edge(_), "props") => Some(RelSpec {
                rel_name: "has_property",
                entity_to_value: true,
            }),
            (Entity::Node(_), "concept") | (Entity::Edge(_), "concept") => Some(RelSpec {
                rel_name: "has_concept",
                entity_to_value: true,
            }),
            (Entity::Property(_), "tags") => Some(RelSpec {
                rel_name: "has_tag",
                entity_to_value: true,
            }),
            (Entity::Property(_), "concept") => Some(RelSpec {
                rel_name: "has_concept",
                entity_to_value: true,
            }),
            (Entity::Property(_), "value_set") => Some(RelSpec {
                rel_name: "has_value_set",
                entity_to_value: true,
            }),
            (Entity::Term(_), "tags") => Some(RelSpec {
                rel_name: "has_tag",
                entity_to_value: true,
            }),
            (Entity::Term(_), "origin") => Some(RelSpec {
                rel_name: "has_origin",
                entity_to_value: true,
            }),
            (Entity::Term(_), "concept") => Some(RelSpec {
                rel_name: "has_concept",
                entity_to_value: true,
            }),
            (Entity::ValueSet(_), "tags") => Some(RelSpec {
                rel_name: "has_tag",
                entity_to_value: true,
            }),
            (Entity::ValueSet(_), "origin") => Some(RelSpec {
                rel_name: "has_origin",
                entity_to_value: true,
            }),
            (Entity::ValueSet(_), "terms") => Some(RelSpec {
                rel_name: "has_term",
                entity_to_value: true,
            }),
            (Entity::Concept(_), "tags") => Some(RelSpec {
                rel_name: "has_tag",
                entity_to_value: true,
            }),
            // Concept.terms is the sole no-marker relationship in this
            // schema: direction is term -> concept via "represents".
            (Entity::Concept(_), "terms") => Some(RelSpec {
                rel_name: "represents",
                entity_to_value: false,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_attr_dict_never_carries_parent_handle() {
        let p = Property::new("subject", "nanoid");
        assert!(!p.attr_dict().contains_key("parent_handle"));
        assert!(!p.attr_dict().contains_key("_parent_handle"));
    }

    #[test]
    fn concept_terms_is_the_only_value_to_entity_relspec() {
        let c = Entity::Concept(Concept::new("c1"));
        let spec = c.relspec("terms").unwrap();
        assert!(!spec.entity_to_value);
        assert_eq!(spec.rel_name, "represents");

        let spec = c.relspec("tags").unwrap();
        assert!(spec.entity_to_value);
    }

    #[test]
    fn term_concept_is_an_object_attr_via_has_concept() {
        let t = Entity::Term(Term::new("Lung", "NCIt"));
        assert_eq!(t.attr_kind("concept"), Some(AttrKind::Object));
        let spec = t.relspec("concept").unwrap();
        assert_eq!(spec.rel_name, "has_concept");
        assert!(spec.entity_to_value);
    }
}
