//! Mapping MDF: the cross-model property-equivalence document consumed
//! by the mapping synthesizer (§4.5, §6 "Mapping MDF").
//!
//! `Props` nests four levels deep: source parent → source prop → target
//! model → a list of `{target_prop: {Parents}}` records. `Parents` itself
//! may arrive as a dotted path, a bracketed list literal, or a bare
//! string (§6, B.4); [`parents_as_list`] normalizes all three.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{CoreError, CoreResult};

/// `{Parents: ...}` attached to one target-property record.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DstPropSpec {
    #[serde(rename = "Parents", default)]
    pub parents: Option<Value>,
}

/// One `{target_prop: {Parents: ...}}` record. Modeled as a map rather
/// than a dedicated struct because YAML authors write it as a single-key
/// mapping; only the first (and intended-only) key is ever read, mirroring
/// the reference's `next(iter(dst_prop_dict))`.
pub type DstPropRecord = IndexMap<String, DstPropSpec>;

/// Parsed Mapping MDF document.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingDoc {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Models", default)]
    pub models: IndexMap<String, Value>,
    #[serde(rename = "Props")]
    pub props: IndexMap<String, IndexMap<String, IndexMap<String, Vec<DstPropRecord>>>>,
}

impl MappingDoc {
    pub fn from_str(yaml: &str) -> CoreResult<Self> {
        serde_yaml::from_str(yaml).map_err(CoreError::from)
    }
}

/// One resolved source→target property pair, with parent paths already
/// reduced to their last segment. Produced by [`MappingDoc::links`].
#[derive(Debug, Clone)]
pub struct PropertyLink {
    pub src_model: String,
    pub src_parent: String,
    pub src_prop: String,
    pub dst_model: String,
    pub dst_parent: String,
    pub dst_prop: String,
}

impl MappingDoc {
    /// Flattens `Props` into one [`PropertyLink`] per `(src_parent,
    /// src_prop, dst_model, dst_prop)` leaf, in document order.
    pub fn links(&self) -> CoreResult<Vec<PropertyLink>> {
        let mut out = Vec::new();
        for (src_parent, src_prop_map) in &self.props {
            for (src_prop, dst_model_map) in src_prop_map {
                for (dst_model, dst_prop_list) in dst_model_map {
                    for record in dst_prop_list {
                        let (dst_prop, spec) = record
                            .iter()
                            .next()
                            .ok_or_else(|| CoreError::Config("empty target-property record".to_string()))?;
                        let dst_parent = last_parent(spec.parents.as_ref())?;
                        let src_parent = last_parent(Some(&Value::String(src_parent.clone())))?;
                        out.push(PropertyLink {
                            src_model: self.source.clone(),
                            src_parent,
                            src_prop: src_prop.clone(),
                            dst_model: dst_model.clone(),
                            dst_parent,
                            dst_prop: dst_prop.clone(),
                        });
                    }
                }
            }
        }
        Ok(out)
    }
}

fn value_to_string(v: &Value) -> CoreResult<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(CoreError::Config(format!("unsupported Parents element: {other:?}"))),
    }
}

/// Parses a `Parents` string field as a dotted path (`"a.b.c"`), a
/// bracketed list literal (`"[a, b, c]"`), or a bare string, returning
/// every segment in order.
fn parse_parent_string(s: &str) -> Vec<String> {
    let trimmed = s.trim();
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return inner
            .split(',')
            .map(|p| p.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }
    if trimmed.contains('.') {
        return trimmed.split('.').map(str::to_string).collect();
    }
    vec![trimmed.to_string()]
}

/// Normalizes a `Parents` value (dotted path / bracketed list literal /
/// bare string / native YAML sequence) to its component segments. Absent
/// `Parents` defaults to the literal placeholder `"CONST"`, matching the
/// reference's `dst_prop_dict.get(dst_prop).get("Parents", "CONST")`.
pub fn parents_as_list(value: Option<&Value>) -> CoreResult<Vec<String>> {
    match value {
        None => Ok(vec!["CONST".to_string()]),
        Some(Value::Sequence(seq)) => seq.iter().map(value_to_string).collect(),
        Some(Value::String(s)) => Ok(parse_parent_string(s)),
        Some(other) => Ok(vec![value_to_string(other)?]),
    }
}

/// The last segment of a `Parents` value - the immediate parent handle.
pub fn last_parent(value: Option<&Value>) -> CoreResult<String> {
    parents_as_list(value)?
        .into_iter()
        .last()
        .ok_or_else(|| CoreError::Config("Parents resolved to an empty path".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_path_keeps_last_segment() {
        let v = Value::String("a.b.c".to_string());
        assert_eq!(last_parent(Some(&v)).unwrap(), "c");
    }

    #[test]
    fn bracketed_list_literal_keeps_last_element() {
        let v = Value::String("[a, b, c]".to_string());
        assert_eq!(last_parent(Some(&v)).unwrap(), "c");
    }

    #[test]
    fn bare_string_is_its_own_single_segment() {
        let v = Value::String("cell_line".to_string());
        assert_eq!(last_parent(Some(&v)).unwrap(), "cell_line");
    }

    #[test]
    fn missing_parents_defaults_to_const() {
        assert_eq!(last_parent(None).unwrap(), "CONST");
    }

    #[test]
    fn parses_full_mapping_document() {
        let yaml = r#"
Source: M1
Models:
  M2: {}
Props:
  a:
    p_src:
      M2:
        - p_dst:
            Parents: "b.c"
"#;
        let doc = MappingDoc::from_str(yaml).unwrap();
        let links = doc.links().unwrap();
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.src_model, "M1");
        assert_eq!(link.src_parent, "a");
        assert_eq!(link.src_prop, "p_src");
        assert_eq!(link.dst_model, "M2");
        assert_eq!(link.dst_parent, "c");
        assert_eq!(link.dst_prop, "p_dst");
    }

    #[test]
    fn missing_parents_field_on_a_real_record_defaults_to_const() {
        let yaml = r#"
Source: M1
Props:
  a:
    p_src:
      M2:
        - p_dst: {}
"#;
        let doc = MappingDoc::from_str(yaml).unwrap();
        let links = doc.links().unwrap();
        assert_eq!(links[0].dst_parent, "CONST");
    }
}
