//! Core node model for annotation documents.
//!
//! A document is a flat set of nodes (images, crops, texts) linked by each
//! node's declared parents, plus one document-level metadata record. Nodes
//! are built from the untyped field bags found in the import document and
//! validated for shape at construction time.

use serde_yaml::{Mapping, Value};

use super::crop::CropRegion;
use super::ids::NodeId;
use super::node_type::{NodeKind, NodeType};
use crate::error::CollectraError;

const KEY_TYPE: &str = "type";
const KEY_ID: &str = "id";
const KEY_PARENTS: &str = "parents";
const KEY_DATA: &str = "data";

/// A single annotation element.
///
/// Shape is fixed per type; `data` and the crop region are mutable through
/// the owning graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) node_type: NodeType,
    pub(crate) label: String,
    pub(crate) data: Option<String>,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) crop_region: Option<CropRegion>,
    /// Unrecognized keys, kept in document order for lossless export.
    pub(crate) extra: Mapping,
}

impl Node {
    /// Builds a node from a document field bag imported under `label`.
    ///
    /// `id` and `type` are mandatory. Crop-bearing types must carry all four
    /// crop fields.
    pub fn from_fields(label: impl Into<String>, fields: &Mapping) -> Result<Self, CollectraError> {
        let id = fields
            .get(KEY_ID)
            .and_then(scalar_string)
            .ok_or_else(|| CollectraError::validation("<unknown>", "missing required field 'id'"))?;

        let tag = fields
            .get(KEY_TYPE)
            .and_then(Value::as_str)
            .filter(|tag| !tag.is_empty())
            .ok_or_else(|| CollectraError::validation(&id, "missing required field 'type'"))?;
        let node_type = NodeType::from_tag(tag);

        let parents = normalize_parents(&id, fields.get(KEY_PARENTS))?;

        let data = match fields.get(KEY_DATA) {
            None | Some(Value::Null) => None,
            Some(value) => Some(scalar_string(value).ok_or_else(|| {
                CollectraError::validation(&id, "field 'data' must be a scalar")
            })?),
        };

        let crop_region = if node_type.kind().is_crop_bearing() {
            Some(CropRegion::from_fields(&id, fields)?)
        } else {
            None
        };

        let mut extra = Mapping::new();
        for (key, value) in fields {
            let reserved = match key.as_str() {
                Some(KEY_TYPE | KEY_ID | KEY_PARENTS | KEY_DATA) => true,
                Some(k) => crop_region.is_some() && CropRegion::FIELDS.contains(&k),
                None => false,
            };
            if !reserved {
                extra.insert(key.clone(), value.clone());
            }
        }

        Ok(Self {
            id: NodeId::new(id),
            node_type,
            label: label.into(),
            data,
            parents,
            crop_region,
            extra,
        })
    }

    /// A whole-image node.
    pub fn image(id: impl Into<NodeId>, label: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self::bare(id.into(), NodeType::of_kind(NodeKind::Image), label.into())
            .with_data(file_name)
    }

    /// A crop of `parent` covering `region`.
    pub fn crop(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        parent: impl Into<NodeId>,
        region: CropRegion,
    ) -> Self {
        let mut node = Self::bare(id.into(), NodeType::of_kind(NodeKind::ImageCrop), label.into());
        node.parents.push(parent.into());
        node.crop_region = Some(region);
        node
    }

    /// A text node attached to `parent` (a crop, or an earlier text it corrects).
    pub fn text(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        parent: impl Into<NodeId>,
        content: impl Into<String>,
    ) -> Self {
        let mut node = Self::bare(id.into(), NodeType::of_kind(NodeKind::Text), label.into());
        node.parents.push(parent.into());
        node.with_data(content)
    }

    fn bare(id: NodeId, node_type: NodeType, label: String) -> Self {
        Self {
            id,
            node_type,
            label,
            data: None,
            parents: Vec::new(),
            crop_region: None,
            extra: Mapping::new(),
        }
    }

    /// Sets the data payload.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Adds a parent, ignoring duplicates.
    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        let parent = parent.into();
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn kind(&self) -> NodeKind {
        self.node_type.kind()
    }

    /// The top-level document key this node was imported under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The data payload, or `""` when the node has none.
    pub fn data(&self) -> &str {
        self.data.as_deref().unwrap_or("")
    }

    /// Whether the node carries a data field at all.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Declared parent ids, in document order.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn crop_region(&self) -> Option<&CropRegion> {
        self.crop_region.as_ref()
    }

    /// Renders the node back into its document field bag.
    pub fn to_fields(&self) -> Mapping {
        let mut fields = Mapping::new();
        fields.insert(Value::from(KEY_TYPE), Value::from(self.node_type.tag()));
        fields.insert(Value::from(KEY_ID), Value::from(self.id.as_str()));
        match self.parents.as_slice() {
            [] => {}
            [single] => {
                fields.insert(Value::from(KEY_PARENTS), Value::from(single.as_str()));
            }
            many => {
                let list = many.iter().map(|p| Value::from(p.as_str())).collect();
                fields.insert(Value::from(KEY_PARENTS), Value::Sequence(list));
            }
        }
        if let Some(data) = &self.data {
            fields.insert(Value::from(KEY_DATA), Value::from(data.as_str()));
        }
        if let Some(region) = &self.crop_region {
            region.write_fields(&mut fields);
        }
        for (key, value) in &self.extra {
            fields.insert(key.clone(), value.clone());
        }
        fields
    }
}

/// The document-level metadata block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub version: Option<String>,
    pub workflow: Option<String>,
    pub timestamp: Option<String>,
    /// Any other keys in the block, kept in document order.
    pub extra: Mapping,
    /// A block that is not a mapping, written back as found.
    pub raw: Option<Value>,
}

impl Metadata {
    /// Reads the metadata block in whatever shape the document carries it.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Mapping(fields) => Self::from_fields(fields),
            other => Self {
                raw: Some(other.clone()),
                ..Self::default()
            },
        }
    }

    pub fn to_value(&self) -> Value {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => Value::Mapping(self.to_fields()),
        }
    }

    /// Parses the metadata block. Scalar values are kept as strings.
    pub fn from_fields(fields: &Mapping) -> Self {
        let mut metadata = Metadata::default();
        for (key, value) in fields {
            let slot = match key.as_str() {
                Some("version") => &mut metadata.version,
                Some("workflow") => &mut metadata.workflow,
                Some("timestamp") => &mut metadata.timestamp,
                _ => {
                    metadata.extra.insert(key.clone(), value.clone());
                    continue;
                }
            };
            match scalar_string(value) {
                Some(s) => *slot = Some(s),
                None => {
                    metadata.extra.insert(key.clone(), value.clone());
                }
            }
        }
        metadata
    }

    pub fn to_fields(&self) -> Mapping {
        let mut fields = Mapping::new();
        for (key, value) in [
            ("version", &self.version),
            ("workflow", &self.workflow),
            ("timestamp", &self.timestamp),
        ] {
            if let Some(value) = value {
                fields.insert(Value::from(key), Value::from(value.as_str()));
            }
        }
        for (key, value) in &self.extra {
            fields.insert(key.clone(), value.clone());
        }
        fields
    }
}

/// Normalizes a `parents` value to an ordered, duplicate-free id list.
///
/// Accepts absence/null (no parents), a single id, or a list of ids.
pub fn normalize_parents(id: &str, value: Option<&Value>) -> Result<Vec<NodeId>, CollectraError> {
    let mut parents: Vec<NodeId> = Vec::new();
    let mut push = |parent: NodeId| {
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    };

    match value {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(items)) => {
            for item in items {
                let parent = scalar_string(item).ok_or_else(|| {
                    CollectraError::validation(id, "every entry in 'parents' must be an id")
                })?;
                push(NodeId::new(parent));
            }
        }
        Some(other) => {
            let parent = scalar_string(other).ok_or_else(|| {
                CollectraError::validation(id, "'parents' must be an id or a list of ids")
            })?;
            push(NodeId::new(parent));
        }
    }

    Ok(parents)
}

/// Renders a YAML scalar as a string; `None` for null and collections.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
