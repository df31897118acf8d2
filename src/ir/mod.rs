//! Annotation graph model for collectra.
//!
//! This module defines the typed node model, the graph store that owns the
//! nodes and their lineage edges, type-filtered traversal over that graph,
//! and the YAML document codec that loads and saves it.
//!
//! # Design Principles
//!
//! 1. **Closed kinds**: node type tags are classified once into
//!    [`NodeKind`]; rule code never matches on tag substrings.
//!
//! 2. **Derived edges**: edges are always derivable from each node's
//!    declared parents. The adjacency index is kept in step on every
//!    mutation and can be checked with [`AnnotationGraph::verify_adjacency`].
//!
//! 3. **Lossless documents**: unknown keys, labels and metadata survive a
//!    load/save cycle.
//!
//! # Example
//!
//! ```
//! use collectra::ir::{AnnotationGraph, CropRegion, Node, NodeKind};
//!
//! let mut graph = AnnotationGraph::new();
//! graph.insert(Node::image("img_001", "image_label", "page.jpg")).unwrap();
//! graph
//!     .insert(Node::crop("crop_001", "crop_label", "img_001", CropRegion::new(0.5, 0.5, 0.2, 0.1)))
//!     .unwrap();
//! graph
//!     .insert(Node::text("text_001", "text_label", "crop_001", "Hello World"))
//!     .unwrap();
//!
//! let texts = graph.children_of_type("crop_001", NodeKind::Text).unwrap();
//! assert_eq!(texts.len(), 1);
//! ```

mod crop;
mod graph;
mod ids;
pub mod io_yaml;
mod model;
mod node_type;
mod traverse;

// Re-export core types for convenient access
pub use crop::{CropRegion, CropRegionInput};
pub use graph::AnnotationGraph;
pub use ids::NodeId;
pub use model::{normalize_parents, Metadata, Node};
pub use node_type::{NodeKind, NodeType};
