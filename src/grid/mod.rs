//! Tabular projection of an annotation graph.
//!
//! One row per node: its own fields joined with its resolved display value
//! and its immediate lineage. This is the shape a review grid consumes.

mod report;

pub use report::{GridReport, GridRow};

use crate::error::CollectraError;
use crate::ir::{AnnotationGraph, NodeId, NodeKind};
use crate::resolve::compute_display_value;

/// Options for building the grid.
#[derive(Clone, Debug, Default)]
pub struct GridOptions {
    /// Only include nodes of this kind.
    pub kind: Option<NodeKind>,
    /// Truncate cells to this many characters in text output.
    pub max_cell_width: Option<usize>,
}

/// Builds one grid row per node, in document order.
pub fn build_grid(graph: &AnnotationGraph, opts: &GridOptions) -> Result<GridReport, CollectraError> {
    let mut rows = Vec::new();

    for node in graph.nodes() {
        if opts.kind.is_some_and(|kind| !node.node_type().is_a(kind)) {
            continue;
        }

        let id = node.id().as_str();
        let display = compute_display_value(graph, id)?;
        rows.push(GridRow {
            id: node.id().clone(),
            node_type: node.node_type().tag().to_string(),
            data: node.data().to_string(),
            display_value: display.value,
            crop_region: display.crop_region,
            display_source_id: display.source_id,
            reason: display.reason,
            parents: owned(graph.parents(id)?),
            children: owned(graph.children(id)?),
            locked: display.locked,
        });
    }

    Ok(GridReport {
        rows,
        max_cell_width: opts.max_cell_width.unwrap_or(report::DEFAULT_CELL_WIDTH),
    })
}

fn owned(ids: Vec<&NodeId>) -> Vec<NodeId> {
    ids.into_iter().cloned().collect()
}
