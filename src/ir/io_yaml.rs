//! Annotation YAML document reader and writer.
//!
//! The document maps each label to either a single node object or a list of
//! node objects, plus one reserved key holding the metadata block:
//!
//! ```yaml
//! collectra_results_metadata:
//!   version: '1.0'
//! image_label:
//!   type: collectra.Image
//!   id: img_001
//!   data: page.jpg
//! text_label:
//! - type: collectra.Text
//!   id: text_001
//!   parents: crop_001
//!   data: Hello World
//! ```
//!
//! Writing groups nodes by label in first-seen order; a label with exactly one
//! node is written as an object, otherwise as a list.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use super::graph::AnnotationGraph;
use super::model::{scalar_string, Metadata};
use crate::error::CollectraError;

/// Top-level key of the metadata block.
pub const METADATA_KEY: &str = "collectra_results_metadata";

// ============================================================================
// Public API
// ============================================================================

/// Reads an annotation document from a YAML file.
pub fn read_yaml_document(path: &Path) -> Result<AnnotationGraph, CollectraError> {
    let text = fs::read_to_string(path).map_err(CollectraError::Io)?;
    let graph = parse_document(&text, path)?;
    info!(path = %path.display(), nodes = graph.len(), edges = graph.edge_count(), "loaded document");
    Ok(graph)
}

/// Writes an annotation document to a YAML file.
pub fn write_yaml_document(path: &Path, graph: &AnnotationGraph) -> Result<(), CollectraError> {
    let text = render_document(graph, path)?;
    fs::write(path, text).map_err(CollectraError::Io)?;
    info!(path = %path.display(), nodes = graph.len(), "saved document");
    Ok(())
}

/// Parses an annotation document from a YAML string.
pub fn from_yaml_str(yaml: &str) -> Result<AnnotationGraph, CollectraError> {
    parse_document(yaml, Path::new("<string>"))
}

/// Parses an annotation document from bytes.
pub fn from_yaml_slice(bytes: &[u8]) -> Result<AnnotationGraph, CollectraError> {
    let path = Path::new("<bytes>");
    let yaml = std::str::from_utf8(bytes).map_err(|err| CollectraError::DocumentInvalid {
        path: path.to_path_buf(),
        message: format!("document is not valid UTF-8: {err}"),
    })?;
    parse_document(yaml, path)
}

/// Serializes a graph to an annotation YAML string.
pub fn to_yaml_string(graph: &AnnotationGraph) -> Result<String, CollectraError> {
    render_document(graph, Path::new("<string>"))
}

/// Builds a graph from an already-parsed document mapping.
///
/// Entries that are not mappings, or carry no `id`, are skipped with a
/// warning. Any other malformed node fails the whole import.
pub fn from_import_shape(doc: &Mapping) -> Result<AnnotationGraph, CollectraError> {
    import_mapping(doc, Path::new("<mapping>"))
}

/// Converts a graph back into the label-grouped document mapping.
///
/// Fails with `MissingLabel`/`MissingType` for a node that lacks the
/// bookkeeping needed to place it in the document.
pub fn to_import_shape(graph: &AnnotationGraph) -> Result<Mapping, CollectraError> {
    let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();
    let mut group_of: HashMap<&str, usize> = HashMap::new();

    for node in graph.nodes() {
        let label = node.label();
        if label.is_empty() {
            return Err(CollectraError::MissingLabel(node.id().to_string()));
        }
        if node.node_type().tag().is_empty() {
            return Err(CollectraError::MissingType(node.id().to_string()));
        }

        let slot = *group_of.entry(label).or_insert_with(|| {
            groups.push((label, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(Value::Mapping(node.to_fields()));
    }

    let mut doc = Mapping::new();
    if let Some(metadata) = graph.metadata() {
        doc.insert(Value::from(METADATA_KEY), metadata.to_value());
    }
    for (label, mut items) in groups {
        let value = if items.len() == 1 {
            items.remove(0)
        } else {
            Value::Sequence(items)
        };
        doc.insert(Value::from(label), value);
    }

    Ok(doc)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_document(yaml: &str, path: &Path) -> Result<AnnotationGraph, CollectraError> {
    if yaml.trim().is_empty() {
        return Ok(AnnotationGraph::new());
    }
    let doc: Value = serde_yaml::from_str(yaml).map_err(|source| CollectraError::YamlParse {
        path: path.to_path_buf(),
        source,
    })?;
    match doc {
        Value::Mapping(map) => import_mapping(&map, path),
        Value::Null => Ok(AnnotationGraph::new()),
        _ => Err(CollectraError::DocumentInvalid {
            path: path.to_path_buf(),
            message: "top level must be a mapping of labels to nodes".to_string(),
        }),
    }
}

fn import_mapping(doc: &Mapping, path: &Path) -> Result<AnnotationGraph, CollectraError> {
    let mut graph = AnnotationGraph::new();

    for (key, value) in doc {
        // Unquoted numeric or boolean labels are still labels.
        let label = scalar_string(key).ok_or_else(|| CollectraError::DocumentInvalid {
            path: path.to_path_buf(),
            message: format!("top-level key {key:?} is not a label"),
        })?;

        if label == METADATA_KEY {
            graph.set_metadata(Some(Metadata::from_value(value)));
            continue;
        }

        let items: &[Value] = match value {
            Value::Sequence(items) => items,
            single => std::slice::from_ref(single),
        };

        for item in items {
            let Value::Mapping(fields) = item else {
                warn!(label = %label, "skipping non-mapping item");
                continue;
            };
            if !fields.contains_key("id") {
                warn!(label = %label, "skipping item without an id");
                continue;
            }
            graph.add_node(&label, fields)?;
        }
    }

    Ok(graph)
}

/// Writes each top-level entry as its own block, separated by a blank line.
fn render_document(graph: &AnnotationGraph, path: &Path) -> Result<String, CollectraError> {
    let doc = to_import_shape(graph)?;
    let mut out = String::new();

    for (key, value) in doc {
        let mut block = Mapping::new();
        block.insert(key, value);
        let text = serde_yaml::to_string(&block).map_err(|source| CollectraError::YamlWrite {
            path: path.to_path_buf(),
            source,
        })?;
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&text);
    }

    Ok(out)
}
