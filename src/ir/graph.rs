//! The annotation graph: node storage plus parent/child adjacency.
//!
//! Nodes live in an arena of vertices addressed by dense indices; the
//! id → index map is only consulted at the public boundary. Adjacency lists
//! are maintained incrementally inside [`AnnotationGraph::insert`] and
//! [`AnnotationGraph::remove_node`] and are never left stale between calls.
//! [`AnnotationGraph::verify_adjacency`] recomputes them from node data.
//!
//! A parent referenced before it is loaded gets a placeholder vertex, so the
//! order nodes appear in the document does not change the edge set.

use std::collections::HashMap;

use serde_yaml::Mapping;
use tracing::debug;

use super::crop::{CropRegion, CropRegionInput};
use super::ids::NodeId;
use super::model::{Metadata, Node};
use super::node_type::NodeKind;
use crate::error::CollectraError;

#[derive(Clone, Debug)]
struct Vertex {
    id: NodeId,
    /// `None` for a parent that has been referenced but not loaded.
    node: Option<Node>,
    /// Child vertices, in edge insertion order.
    children: Vec<usize>,
    /// Parent vertices, in the node's declared order.
    parents: Vec<usize>,
}

impl Vertex {
    fn placeholder(id: NodeId) -> Self {
        Self {
            id,
            node: None,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }
}

/// One loaded annotation document: nodes, lineage edges and metadata.
#[derive(Clone, Debug, Default)]
pub struct AnnotationGraph {
    vertices: Vec<Option<Vertex>>,
    free: Vec<usize>,
    index: HashMap<NodeId, usize>,
    /// Loaded node vertices in insertion order.
    order: Vec<usize>,
    metadata: Option<Metadata>,
}

impl AnnotationGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loaded nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: Option<Metadata>) {
        self.metadata = metadata;
    }

    /// Builds a node from a document field bag and inserts it.
    pub fn add_node(&mut self, label: &str, fields: &Mapping) -> Result<&Node, CollectraError> {
        let node = Node::from_fields(label, fields)?;
        self.insert(node)
    }

    /// Inserts an already-built node and one edge per declared parent.
    ///
    /// Fails with `DuplicateId` if a node with the same id is loaded. The
    /// graph is unchanged on failure.
    pub fn insert(&mut self, node: Node) -> Result<&Node, CollectraError> {
        if self.node_index(node.id.as_str()).is_some() {
            return Err(CollectraError::DuplicateId(node.id.to_string()));
        }

        let idx = self.intern(&node.id);
        let mut parent_idxs = Vec::with_capacity(node.parents.len());
        for parent in &node.parents {
            let pidx = self.intern(parent);
            self.live_mut(pidx)?.children.push(idx);
            parent_idxs.push(pidx);
        }

        debug!(id = %node.id, parents = node.parents.len(), "inserted node");

        self.order.push(idx);
        let vertex = self.live_mut(idx)?;
        vertex.parents = parent_idxs;
        let node: &Node = vertex.node.insert(node);
        Ok(node)
    }

    /// Removes a node and every edge incident to it.
    ///
    /// The removed id is also dropped from the surviving children's declared
    /// parents, so edges stay derivable from node data.
    pub fn remove_node(&mut self, id: &str) -> Result<Node, CollectraError> {
        let idx = self
            .node_index(id)
            .ok_or_else(|| CollectraError::NotFound(id.to_string()))?;

        let (parents, children) = {
            let vertex = self.live_mut(idx)?;
            (
                std::mem::take(&mut vertex.parents),
                std::mem::take(&mut vertex.children),
            )
        };

        for pidx in parents {
            if pidx == idx {
                continue;
            }
            let parent = self.live_mut(pidx)?;
            parent.children.retain(|&c| c != idx);
            if parent.node.is_none() && parent.children.is_empty() {
                self.release(pidx);
            }
        }

        for cidx in children {
            if cidx == idx {
                continue;
            }
            let child = self.live_mut(cidx)?;
            child.parents.retain(|&p| p != idx);
            if let Some(node) = child.node.as_mut() {
                node.parents.retain(|p| p.as_str() != id);
            }
        }

        let node = self
            .live_mut(idx)?
            .node
            .take()
            .ok_or_else(|| CollectraError::InvariantViolation(format!("vertex for '{id}' lost its node")))?;
        self.order.retain(|&i| i != idx);
        self.release(idx);

        debug!(id, "removed node");
        Ok(node)
    }

    /// Looks up a loaded node.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index
            .get(id)
            .and_then(|&idx| self.vertex(idx))
            .and_then(|vertex| vertex.node.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index(id).is_some()
    }

    /// Loaded nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order
            .iter()
            .filter_map(|&idx| self.vertex(idx))
            .filter_map(|vertex| vertex.node.as_ref())
    }

    /// Loaded nodes whose type is of `kind`, in insertion order.
    pub fn nodes_of_type(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes().filter(move |node| node.node_type.is_a(kind))
    }

    /// The first loaded Image node, if any.
    pub fn root_image(&self) -> Option<&Node> {
        self.nodes_of_type(NodeKind::Image).next()
    }

    /// All `(parent, child)` edges, grouped by child in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
        self.order
            .iter()
            .filter_map(|&cidx| self.vertex(cidx))
            .flat_map(move |child| {
                child
                    .parents
                    .iter()
                    .filter_map(move |&pidx| self.vertex(pidx))
                    .map(move |parent| (&parent.id, &child.id))
            })
    }

    pub fn edge_count(&self) -> usize {
        self.order
            .iter()
            .filter_map(|&idx| self.vertex(idx))
            .map(|vertex| vertex.parents.len())
            .sum()
    }

    /// Ids referenced as parents that never materialized as nodes.
    pub fn dangling_parents(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.vertices
            .iter()
            .flatten()
            .filter(|vertex| vertex.node.is_none())
            .map(|vertex| &vertex.id)
    }

    /// Immediate children of `id`, in edge insertion order.
    ///
    /// Fails with `NotFound` for an id the graph has never seen, which is
    /// distinct from a known id with no children.
    pub fn children(&self, id: &str) -> Result<Vec<&NodeId>, CollectraError> {
        let vertex = self.known_vertex(id)?;
        Ok(self.ids_of(&vertex.children))
    }

    /// Immediate parents of `id`, in declared order.
    pub fn parents(&self, id: &str) -> Result<Vec<&NodeId>, CollectraError> {
        let vertex = self.known_vertex(id)?;
        Ok(self.ids_of(&vertex.parents))
    }

    /// Immediate children of `id` whose type is of `kind`.
    pub fn children_of_type(&self, id: &str, kind: NodeKind) -> Result<Vec<&NodeId>, CollectraError> {
        let idx = self.known_index(id)?;
        Ok(self
            .typed_children(idx, kind)
            .filter_map(|cidx| self.vertex_id(cidx))
            .collect())
    }

    /// Replaces a node's data payload.
    pub fn set_data(&mut self, id: &str, value: impl Into<String>) -> Result<(), CollectraError> {
        let node = self.node_mut(id)?;
        node.data = Some(value.into());
        debug!(id, "updated node data");
        Ok(())
    }

    /// Returns a crop node's region.
    pub fn crop_region(&self, id: &str) -> Result<CropRegion, CollectraError> {
        let node = self
            .get(id)
            .ok_or_else(|| CollectraError::NotFound(id.to_string()))?;
        node.crop_region
            .ok_or_else(|| CollectraError::NotACropNode(id.to_string()))
    }

    /// Replaces a crop node's region wholesale.
    ///
    /// Checks run in order: node exists, node is crop-bearing, region is
    /// complete.
    pub fn set_crop_region(
        &mut self,
        id: &str,
        region: impl Into<CropRegionInput>,
    ) -> Result<(), CollectraError> {
        let node = self.node_mut(id)?;
        if !node.kind().is_crop_bearing() {
            return Err(CollectraError::NotACropNode(id.to_string()));
        }
        node.crop_region = Some(region.into().into_region(id)?);
        debug!(id, "updated crop region");
        Ok(())
    }

    /// Recomputes adjacency from node data and compares it with the
    /// maintained lists.
    pub fn verify_adjacency(&self) -> Result<(), CollectraError> {
        let violation =
            |msg: String| -> Result<(), CollectraError> { Err(CollectraError::InvariantViolation(msg)) };

        for (id, &idx) in &self.index {
            match self.vertex(idx) {
                Some(vertex) if &vertex.id == id => {}
                _ => return violation(format!("index entry '{id}' points at a stale vertex")),
            }
        }

        let mut expected_children: HashMap<usize, Vec<usize>> = HashMap::new();
        for &cidx in &self.order {
            let Some(vertex) = self.vertex(cidx) else {
                return violation(format!("ordered slot {cidx} is empty"));
            };
            let Some(node) = vertex.node.as_ref() else {
                return violation(format!("ordered vertex '{}' has no node", vertex.id));
            };
            let declared: Vec<Option<usize>> = node
                .parents
                .iter()
                .map(|p| self.index.get(p.as_str()).copied())
                .collect();
            if declared.iter().any(Option::is_none)
                || declared.iter().flatten().ne(vertex.parents.iter())
            {
                return violation(format!("parents of '{}' diverge from node data", vertex.id));
            }
            for &pidx in &vertex.parents {
                expected_children.entry(pidx).or_default().push(cidx);
            }
        }

        for (idx, vertex) in self.vertices.iter().enumerate() {
            let Some(vertex) = vertex else { continue };
            if self.index.get(vertex.id.as_str()) != Some(&idx) {
                return violation(format!("vertex '{}' is not indexed", vertex.id));
            }
            let expected = expected_children.remove(&idx).unwrap_or_default();
            if expected != vertex.children {
                return violation(format!("children of '{}' diverge from node data", vertex.id));
            }
            if vertex.node.is_none() && vertex.children.is_empty() {
                return violation(format!("placeholder '{}' has no children", vertex.id));
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Arena internals shared with the traversal module
    // ------------------------------------------------------------------

    /// Index of a loaded node.
    pub(super) fn node_index(&self, id: &str) -> Option<usize> {
        self.index
            .get(id)
            .copied()
            .filter(|&idx| self.vertex(idx).is_some_and(|vertex| vertex.node.is_some()))
    }

    pub(super) fn vertex_id(&self, idx: usize) -> Option<&NodeId> {
        self.vertex(idx).map(|vertex| &vertex.id)
    }

    pub(super) fn typed_children(
        &self,
        idx: usize,
        kind: NodeKind,
    ) -> impl Iterator<Item = usize> + '_ {
        self.vertex(idx)
            .into_iter()
            .flat_map(|vertex| vertex.children.iter().copied())
            .filter(move |&cidx| {
                self.vertex(cidx)
                    .and_then(|child| child.node.as_ref())
                    .is_some_and(|node| node.node_type.is_a(kind))
            })
    }

    fn known_index(&self, id: &str) -> Result<usize, CollectraError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| CollectraError::NotFound(id.to_string()))
    }

    fn known_vertex(&self, id: &str) -> Result<&Vertex, CollectraError> {
        let idx = self.known_index(id)?;
        self.live(idx)
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, CollectraError> {
        let idx = self
            .node_index(id)
            .ok_or_else(|| CollectraError::NotFound(id.to_string()))?;
        self.live_mut(idx)?
            .node
            .as_mut()
            .ok_or_else(|| CollectraError::NotFound(id.to_string()))
    }

    fn ids_of(&self, idxs: &[usize]) -> Vec<&NodeId> {
        idxs.iter().filter_map(|&idx| self.vertex_id(idx)).collect()
    }

    fn intern(&mut self, id: &NodeId) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let vertex = Vertex::placeholder(id.clone());
        let idx = match self.free.pop() {
            Some(idx) => {
                self.vertices[idx] = Some(vertex);
                idx
            }
            None => {
                self.vertices.push(Some(vertex));
                self.vertices.len() - 1
            }
        };
        self.index.insert(id.clone(), idx);
        idx
    }

    fn release(&mut self, idx: usize) {
        if let Some(vertex) = self.vertices.get_mut(idx).and_then(Option::take) {
            self.index.remove(&vertex.id);
            self.free.push(idx);
        }
    }

    fn vertex(&self, idx: usize) -> Option<&Vertex> {
        self.vertices.get(idx).and_then(Option::as_ref)
    }

    fn live(&self, idx: usize) -> Result<&Vertex, CollectraError> {
        self.vertex(idx).ok_or_else(|| stale_slot(idx))
    }

    fn live_mut(&mut self, idx: usize) -> Result<&mut Vertex, CollectraError> {
        self.vertices
            .get_mut(idx)
            .and_then(Option::as_mut)
            .ok_or_else(|| stale_slot(idx))
    }
}

fn stale_slot(idx: usize) -> CollectraError {
    CollectraError::InvariantViolation(format!("adjacency references empty slot {idx}"))
}
