//! Document inspection and statistics.
//!
//! Produces a structured report over an annotation graph: node counts per
//! kind, how crops resolve (container, annotated, blank, corrected), the
//! label distribution, lineage mappings and referential problems.

mod report;

pub use report::{CropSection, InspectReport, LabelCount, LineageEntry, SummarySection};

use std::collections::HashMap;

use crate::error::CollectraError;
use crate::ir::{AnnotationGraph, NodeId, NodeKind};
use crate::resolve::{compute_display_value, DisplayRule};

/// Options for document inspection.
#[derive(Clone, Debug)]
pub struct InspectOptions {
    /// Number of top labels to show.
    pub top_labels: usize,
    /// Include parent/child mappings for every node.
    pub lineage: bool,
    /// Width of histogram bars (in characters).
    pub bar_width: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            top_labels: 10,
            lineage: false,
            bar_width: 20,
        }
    }
}

/// Inspect a graph and produce a report.
pub fn inspect_graph(graph: &AnnotationGraph, opts: &InspectOptions) -> Result<InspectReport, CollectraError> {
    let summary = compute_summary(graph);
    let crops = compute_crops(graph)?;
    let (labels, other_labels) = compute_labels(graph, opts.top_labels);

    let lineage = if opts.lineage {
        compute_lineage(graph)?
    } else {
        Vec::new()
    };

    let mut dangling: Vec<NodeId> = graph.dangling_parents().cloned().collect();
    dangling.sort();

    Ok(InspectReport {
        summary,
        crops,
        labels,
        other_labels,
        lineage,
        dangling_parents: dangling,
        adjacency_ok: graph.verify_adjacency().is_ok(),
        bar_width: opts.bar_width,
    })
}

fn compute_summary(graph: &AnnotationGraph) -> SummarySection {
    let count = |kind| graph.nodes_of_type(kind).count();
    SummarySection {
        nodes: graph.len(),
        edges: graph.edge_count(),
        images: count(NodeKind::Image),
        crops: count(NodeKind::ImageCrop),
        texts: count(NodeKind::Text),
        other: count(NodeKind::Other),
        metadata_version: graph.metadata().and_then(|m| m.version.clone()),
    }
}

fn compute_crops(graph: &AnnotationGraph) -> Result<CropSection, CollectraError> {
    let mut section = CropSection::default();

    for node in graph.nodes_of_type(NodeKind::ImageCrop) {
        let id = node.id().as_str();
        let display = compute_display_value(graph, id)?;
        match display.rule {
            DisplayRule::ContainerCrop => section.container += 1,
            DisplayRule::LeafCropWithText => {
                section.annotated += 1;
                // A source that is not a direct child means the chain was followed.
                let direct = graph.children_of_type(id, NodeKind::Text)?;
                if display
                    .source_id
                    .as_ref()
                    .is_some_and(|source| !direct.contains(&source))
                {
                    section.corrected += 1;
                }
            }
            DisplayRule::LeafCropWithoutText => section.blank += 1,
            _ => {}
        }

        let (x1, y1, x2, y2) = graph.crop_region(id)?.to_xyxy();
        if x1 < 0.0 || y1 < 0.0 || x2 > 1.0 || y2 > 1.0 {
            section.out_of_frame += 1;
        }
    }

    Ok(section)
}

/// Counts nodes per label, sorted by count descending then name ascending.
fn compute_labels(graph: &AnnotationGraph, top_n: usize) -> (Vec<LabelCount>, usize) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for node in graph.nodes() {
        *counts.entry(node.label()).or_insert(0) += 1;
    }

    let mut sorted: Vec<(&str, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let other = sorted.iter().skip(top_n).map(|(_, count)| count).sum();
    let entries = sorted
        .into_iter()
        .take(top_n)
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();

    (entries, other)
}

fn compute_lineage(graph: &AnnotationGraph) -> Result<Vec<LineageEntry>, CollectraError> {
    graph
        .nodes()
        .map(|node| {
            let id = node.id().as_str();
            Ok(LineageEntry {
                id: node.id().clone(),
                kind: node.kind(),
                parents: graph.parents(id)?.into_iter().cloned().collect(),
                children: graph.children(id)?.into_iter().cloned().collect(),
            })
        })
        .collect()
}
