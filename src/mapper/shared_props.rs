//! Shared-property separation: before traversal, any Property reachable
//! from more than one parent is cloned (fresh identity, fresh surrogate
//! id) for every parent after the first, so the database gets one
//! Property graph-node per parent.

use std::collections::HashSet;

use crate::idgen::IdGenerator;
use crate::metamodel::Model;

/// Single pass over `model.props`, keyed by `(parent_handle, prop_handle)`.
/// Properties without a `shared_id` are assumed independent already and
/// left untouched.
pub fn separate_shared_props(model: &mut Model, ids: &mut dyn IdGenerator) {
    let mut seen: HashSet<String> = HashSet::new();
    let keys: Vec<(String, String)> = model.props.keys().cloned().collect();

    for key in keys {
        let shared_id = match model.props.get(&key).and_then(|p| p.shared_id.clone()) {
            Some(sid) => sid,
            None => continue,
        };
        if seen.insert(shared_id) {
            // first parent keeps the original Property.
            continue;
        }
        let mut clone = model.props[&key].clone();
        clone.shared_id = Some(ids.next_id());
        if let Some(node) = model.nodes.get_mut(&key.0) {
            node.props.insert(key.1.clone(), clone.clone());
        }
        if let Some(edge) = model.edges.values_mut().find(|e| e.handle == key.0) {
            if edge.props.contains_key(&key.1) {
                edge.props.insert(key.1.clone(), clone.clone());
            }
        }
        model.props.insert(key, clone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idgen::CounterIdGenerator;
    use crate::metamodel::{Node, Property};

    #[test]
    fn duplicate_shared_property_gets_a_fresh_clone() {
        let mut model = Model::new("TEST");
        let mut n1 = Node::new("TEST", "cell_line");
        let mut n2 = Node::new("TEST", "clinical_measure_file");

        let mut prop = Property::new("cell_line", "id");
        prop.shared_id = Some("shared-1".to_string());
        n1.props.insert("id".to_string(), prop.clone());

        let mut prop2 = prop.clone();
        prop2.parent_handle = "clinical_measure_file".to_string();
        n2.props.insert("id".to_string(), prop2.clone());

        model.nodes.insert(n1.handle.clone(), n1);
        model.nodes.insert(n2.handle.clone(), n2);
        model
            .props
            .insert(("cell_line".to_string(), "id".to_string()), prop);
        model
            .props
            .insert(("clinical_measure_file".to_string(), "id".to_string()), prop2);

        let mut gen = CounterIdGenerator::new();
        separate_shared_props(&mut model, &mut gen);

        let first = &model.props[&("cell_line".to_string(), "id".to_string())];
        let second = &model.props[&("clinical_measure_file".to_string(), "id".to_string())];
        assert_ne!(first.shared_id, second.shared_id);
    }
}
