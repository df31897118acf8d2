#![allow(dead_code)]

use std::collections::BTreeSet;

use collectra::ir::{AnnotationGraph, CropRegion, Node};
use proptest::prelude::*;
use proptest::sample::Index;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const IMAGE_ID: &str = "img_001";

const CROP_LABELS: [&str; 2] = ["crop_label", "region_label"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// `(id, type tag, data, parents)` for every node.
pub type NodeTuple = (String, String, String, Vec<String>);

pub fn node_tuples(graph: &AnnotationGraph) -> BTreeSet<NodeTuple> {
    graph
        .nodes()
        .map(|node| {
            (
                node.id().to_string(),
                node.node_type().tag().to_string(),
                node.data().to_string(),
                node.parents().iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

pub fn arb_region() -> impl Strategy<Value = CropRegion> {
    (0.0f64..1.0, 0.0f64..1.0, 0.01f64..1.0, 0.01f64..1.0)
        .prop_map(|(x, y, w, h)| CropRegion::new(x, y, w, h))
}

/// Short phrases ending in a period, so no value reads back as a YAML
/// bool, null or float.
pub fn arb_text() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,10}[A-Za-z0-9]".prop_map(|s| format!("{s}."))
}

#[derive(Clone, Debug)]
struct CropSpec {
    parent: Index,
    region: CropRegion,
    label: usize,
}

#[derive(Clone, Debug)]
struct TextSpec {
    parent: Index,
    correction: bool,
    data: String,
}

/// One Image, a tree of crops below it, and Text nodes hanging off crops
/// or correcting earlier Text nodes.
///
/// Crop `i` is parented by the image or an earlier crop; Text `j` by a crop
/// or, for corrections, an earlier Text. The result is always acyclic.
pub fn arb_graph(max_crops: usize, max_texts: usize) -> BoxedStrategy<AnnotationGraph> {
    let crop = (any::<Index>(), arb_region(), 0..CROP_LABELS.len())
        .prop_map(|(parent, region, label)| CropSpec { parent, region, label });
    let text = (any::<Index>(), any::<bool>(), arb_text())
        .prop_map(|(parent, correction, data)| TextSpec { parent, correction, data });

    (
        prop::collection::vec(crop, 1..=max_crops),
        prop::collection::vec(text, 0..=max_texts),
    )
        .prop_map(|(crops, texts)| build_graph(&crops, &texts))
        .boxed()
}

fn build_graph(crops: &[CropSpec], texts: &[TextSpec]) -> AnnotationGraph {
    let mut graph = AnnotationGraph::new();
    graph
        .insert(Node::image(IMAGE_ID, "image_label", "page.jpg"))
        .expect("insert image");

    for (i, spec) in crops.iter().enumerate() {
        let parent = match spec.parent.index(i + 1) {
            0 => IMAGE_ID.to_string(),
            k => format!("crop_{}", k - 1),
        };
        let node = Node::crop(format!("crop_{i}"), CROP_LABELS[spec.label], parent, spec.region)
            .with_data("page.jpg");
        graph.insert(node).expect("insert crop");
    }

    for (j, spec) in texts.iter().enumerate() {
        let parent = if spec.correction && j > 0 {
            format!("text_{}", spec.parent.index(j))
        } else {
            format!("crop_{}", spec.parent.index(crops.len()))
        };
        graph
            .insert(Node::text(format!("text_{j}"), "text_label", parent, spec.data.as_str()))
            .expect("insert text");
    }

    graph
}
