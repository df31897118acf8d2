//! Editing session over one annotation document.
//!
//! A [`Session`] owns the loaded graph together with the path it came from.
//! Queries go straight to the graph; every successful mutation is written
//! back to the document before returning. When that write fails the error is
//! returned as-is and the in-memory graph stays ahead of the file.

use std::fmt;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, RngExt, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::error::CollectraError;
use crate::grid::{build_grid, GridOptions, GridReport};
use crate::ir::io_yaml::{read_yaml_document, write_yaml_document, METADATA_KEY};
use crate::ir::{AnnotationGraph, CropRegionInput, Node, NodeId, NodeKind};
use crate::resolve::{compute_display_value, DisplayResult};

/// Label given to Text nodes created from the editor.
pub const USER_TEXT_LABEL: &str = "user_text";

/// A node's own fields and immediate lineage.
#[derive(Clone, Debug, Serialize)]
pub struct NodeInfo {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub data: String,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
}

/// The open document and the graph built from it.
pub struct Session {
    graph: AnnotationGraph,
    path: PathBuf,
    rng: StdRng,
}

impl Session {
    /// Loads the document at `path`.
    pub fn open(path: &Path) -> Result<Self, CollectraError> {
        let graph = read_yaml_document(path)?;
        Ok(Self::from_graph(graph, path))
    }

    /// Wraps an already-built graph. Nothing is read from `path`.
    pub fn from_graph(graph: AnnotationGraph, path: &Path) -> Self {
        Self {
            graph,
            path: path.to_path_buf(),
            rng: StdRng::seed_from_u64(rand::rng().random()),
        }
    }

    /// Makes generated node ids reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn graph(&self) -> &AnnotationGraph {
        &self.graph
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the graph back to the document path.
    pub fn save(&self) -> Result<(), CollectraError> {
        write_yaml_document(&self.path, &self.graph)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn resolve(&self, id: &str) -> Result<DisplayResult, CollectraError> {
        compute_display_value(&self.graph, id)
    }

    pub fn grid(&self, opts: &GridOptions) -> Result<GridReport, CollectraError> {
        build_grid(&self.graph, opts)
    }

    pub fn node_info(&self, id: &str) -> Result<NodeInfo, CollectraError> {
        let node = self
            .graph
            .get(id)
            .ok_or_else(|| CollectraError::NotFound(id.to_string()))?;
        Ok(NodeInfo {
            id: node.id().clone(),
            node_type: node.node_type().tag().to_string(),
            label: node.label().to_string(),
            data: node.data().to_string(),
            parents: self.graph.parents(id)?.into_iter().cloned().collect(),
            children: self.graph.children(id)?.into_iter().cloned().collect(),
        })
    }

    /// Ids of every node of `kind`, in document order.
    pub fn nodes_by_type(&self, kind: NodeKind) -> Vec<&NodeId> {
        self.graph.nodes_of_type(kind).map(Node::id).collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Creates an ImageCrop under `parent`, or under the first Image when no
    /// parent is given. Returns the new id, `<label>-<8 hex digits>`.
    ///
    /// No Text child is created; text is attached later with
    /// [`Session::edit_text`].
    pub fn create_crop(
        &mut self,
        region: impl Into<CropRegionInput>,
        label: &str,
        parent: Option<&str>,
    ) -> Result<NodeId, CollectraError> {
        validate_label(label)?;

        let root = self
            .graph
            .root_image()
            .ok_or_else(|| CollectraError::NotFound("root Image node".to_string()))?;
        let image_data = root.data().to_string();
        let root_id = root.id().clone();

        let parent = match parent.filter(|p| !p.is_empty()) {
            Some(p) if self.graph.get(p).is_none() => {
                return Err(CollectraError::NotFound(p.to_string()))
            }
            Some(p) => NodeId::from(p),
            None => root_id,
        };

        let id = self.fresh_id(&format!("{label}-"));
        let region = region.into().into_region(id.as_str())?;
        let mut node = Node::crop(id.clone(), label, parent, region);
        if !image_data.is_empty() {
            node = node.with_data(image_data);
        }
        self.graph.insert(node)?;

        info!(id = %id, "created crop");
        self.save()?;
        Ok(id)
    }

    /// Sets the text of an existing node, or attaches a new Text node to a crop.
    ///
    /// A non-empty `node_id` always wins: that node's data is replaced and
    /// `crop_id` is ignored. Otherwise a Text child `user_text_<8 hex>` is
    /// created under `crop_id`. Returns the id of the node that now holds
    /// the text.
    pub fn edit_text(
        &mut self,
        node_id: Option<&str>,
        text: &str,
        crop_id: Option<&str>,
    ) -> Result<NodeId, CollectraError> {
        let id = match (node_id.filter(|id| !id.is_empty()), crop_id.filter(|id| !id.is_empty())) {
            (Some(node_id), _) => {
                let node = self
                    .graph
                    .get(node_id)
                    .ok_or_else(|| CollectraError::NotFound(node_id.to_string()))?;
                if !node.has_data() {
                    return Err(CollectraError::validation(node_id, "node has no data field to set"));
                }
                self.graph.set_data(node_id, text)?;
                NodeId::from(node_id)
            }
            (None, Some(crop_id)) => {
                let crop = self
                    .graph
                    .get(crop_id)
                    .ok_or_else(|| CollectraError::NotFound(crop_id.to_string()))?;
                if !crop.node_type().is_a(NodeKind::ImageCrop) {
                    return Err(CollectraError::NotACropNode(crop_id.to_string()));
                }
                let id = self.fresh_id("user_text_");
                self.graph
                    .insert(Node::text(id.clone(), USER_TEXT_LABEL, crop_id, text))?;
                id
            }
            (None, None) => {
                return Err(CollectraError::validation(
                    "",
                    "either a node id or a crop id is required",
                ))
            }
        };

        info!(id = %id, "updated text");
        self.save()?;
        Ok(id)
    }

    /// Replaces a crop's region. All four fields are required.
    pub fn edit_crop_region(
        &mut self,
        id: &str,
        region: impl Into<CropRegionInput>,
    ) -> Result<(), CollectraError> {
        self.graph.set_crop_region(id, region)?;
        info!(id, "updated crop region");
        self.save()
    }

    /// Deletes a node together with its direct Text children.
    ///
    /// Returns the removed ids, children first.
    pub fn delete_annotation(&mut self, id: &str) -> Result<Vec<NodeId>, CollectraError> {
        if self.graph.get(id).is_none() {
            return Err(CollectraError::NotFound(id.to_string()));
        }

        let texts: Vec<NodeId> = self
            .graph
            .children_of_type(id, NodeKind::Text)?
            .into_iter()
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(texts.len() + 1);
        for text in texts {
            self.graph.remove_node(text.as_str())?;
            removed.push(text);
        }
        self.graph.remove_node(id)?;
        removed.push(NodeId::from(id));

        info!(id, removed = removed.len(), "deleted annotation");
        self.save()?;
        Ok(removed)
    }

    /// An id with `prefix` and 8 random hex digits not already in the graph.
    fn fresh_id(&mut self, prefix: &str) -> NodeId {
        loop {
            let candidate = format!("{prefix}{:08x}", self.rng.random::<u32>());
            if !self.graph.contains(&candidate) {
                return NodeId::from(candidate);
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("nodes", &self.graph.len())
            .finish_non_exhaustive()
    }
}

fn validate_label(label: &str) -> Result<(), CollectraError> {
    if label.is_empty() {
        return Err(CollectraError::validation("", "label must not be empty"));
    }
    if label == METADATA_KEY {
        return Err(CollectraError::validation(
            "",
            format!("label '{METADATA_KEY}' is reserved for document metadata"),
        ));
    }
    Ok(())
}
