//! Display value resolution.
//!
//! Every node has exactly one piece of text that should be shown for it.
//! For a crop, that is the newest correction in its chain of Text nodes; for
//! images and grouping crops it is deliberately blank. The rules are applied
//! in a fixed priority order:
//!
//! 1. Unknown id: no value.
//! 2. Image: blank, locked.
//! 3. ImageCrop:
//!    - with ImageCrop children (container crop): blank, locked;
//!    - with a Text child: the data of the deepest Text in the chain that
//!      starts at the first Text child;
//!    - otherwise: blank, editable.
//! 4. Text: its own data.
//! 5. Anything else: blank.
//!
//! Resolution is a pure function of the graph; nothing is cached.

use serde::Serialize;

use crate::error::CollectraError;
use crate::ir::{AnnotationGraph, CropRegion, Node, NodeId, NodeKind};

/// Which rule produced a [`DisplayResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayRule {
    NotFound,
    Image,
    ContainerCrop,
    LeafCropWithText,
    LeafCropWithoutText,
    Text,
    UnknownType,
}

/// The text to show for one node, and why.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayResult {
    /// The value to display. `None` only when the node does not exist;
    /// blank rules produce `Some("")`.
    pub value: Option<String>,
    /// The node whose data is being shown.
    pub source_id: Option<NodeId>,
    /// Present for crop nodes.
    pub crop_region: Option<CropRegion>,
    /// Human-readable explanation of the rule applied.
    pub reason: String,
    /// True when the displayed value must not be edited.
    pub locked: bool,
    pub rule: DisplayRule,
}

impl DisplayResult {
    fn blank(rule: DisplayRule, reason: String, locked: bool) -> Self {
        Self {
            value: Some(String::new()),
            source_id: None,
            crop_region: None,
            reason,
            locked,
            rule,
        }
    }

    fn with_crop(mut self, region: CropRegion) -> Self {
        self.crop_region = Some(region);
        self
    }

    /// True when the value is empty or absent.
    pub fn is_blank(&self) -> bool {
        self.value.as_deref().map_or(true, str::is_empty)
    }
}

/// Computes the display value for `id`.
///
/// Errors are reserved for graphs that break construction invariants: a crop
/// node without a region, or a Text chain with no terminal node (only
/// possible when corrections form a cycle).
pub fn compute_display_value(graph: &AnnotationGraph, id: &str) -> Result<DisplayResult, CollectraError> {
    let Some(node) = graph.get(id) else {
        return Ok(DisplayResult {
            value: None,
            source_id: None,
            crop_region: None,
            reason: format!("{id} not found"),
            locked: false,
            rule: DisplayRule::NotFound,
        });
    };

    let result = match node.kind() {
        NodeKind::Image => DisplayResult::blank(
            DisplayRule::Image,
            format!("{id} is an Image type: display blank"),
            true,
        ),
        NodeKind::ImageCrop => resolve_crop(graph, node)?,
        NodeKind::Text => DisplayResult {
            value: Some(node.data().to_string()),
            source_id: Some(node.id().clone()),
            crop_region: None,
            reason: "Text element: display data".to_string(),
            locked: false,
            rule: DisplayRule::Text,
        },
        NodeKind::Other => DisplayResult::blank(
            DisplayRule::UnknownType,
            format!("{id} has unknown type {}: display blank", node.node_type()),
            false,
        ),
    };

    Ok(result)
}

fn resolve_crop(graph: &AnnotationGraph, node: &Node) -> Result<DisplayResult, CollectraError> {
    let id = node.id().as_str();
    let region = graph.crop_region(id)?;

    if !graph.children_of_type(id, NodeKind::ImageCrop)?.is_empty() {
        return Ok(DisplayResult::blank(
            DisplayRule::ContainerCrop,
            format!("{id} is a container crop: display blank"),
            true,
        )
        .with_crop(region));
    }

    let texts = graph.children_of_type(id, NodeKind::Text)?;
    let Some(first_text) = texts.first() else {
        return Ok(DisplayResult::blank(
            DisplayRule::LeafCropWithoutText,
            format!("Leaf crop {id} has no text child: display blank"),
            false,
        )
        .with_crop(region));
    };

    let deepest = graph
        .find_deepest(first_text.as_str(), NodeKind::Text)
        .ok_or_else(|| {
            CollectraError::InvariantViolation(format!(
                "expected a terminal Text node below {first_text} for crop {id}, found none"
            ))
        })?;
    let deepest_node = graph
        .get(deepest.as_str())
        .ok_or_else(|| CollectraError::NotFound(deepest.to_string()))?;

    Ok(DisplayResult {
        value: Some(deepest_node.data().to_string()),
        source_id: Some(deepest.clone()),
        crop_region: Some(region),
        reason: format!("Leaf crop {id} with Text child: deepest Text is {deepest}"),
        locked: false,
        rule: DisplayRule::LeafCropWithText,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f64) -> CropRegion {
        CropRegion::new(x, x, 0.2, 0.1)
    }

    /// img_001 -> crop_001 -> text_001 ("Hello World")
    fn sample_graph() -> AnnotationGraph {
        let mut graph = AnnotationGraph::new();
        graph.insert(Node::image("img_001", "image_label", "test_image.jpg")).unwrap();
        graph
            .insert(Node::crop("crop_001", "crop_label", "img_001", region(0.5)).with_data("test_image.jpg"))
            .unwrap();
        graph
            .insert(Node::text("text_001", "text_label", "crop_001", "Hello World"))
            .unwrap();
        graph
    }

    /// container -> {leaf_a -> t1 -> t2, leaf_b}
    fn complex_graph() -> AnnotationGraph {
        let mut graph = AnnotationGraph::new();
        graph.insert(Node::image("img_001", "image_label", "test_image.jpg")).unwrap();
        graph
            .insert(Node::crop("container", "container_crop", "img_001", CropRegion::new(0.5, 0.5, 0.8, 0.8)))
            .unwrap();
        graph
            .insert(Node::crop("leaf_a", "leaf_crop", "container", region(0.3)))
            .unwrap();
        graph
            .insert(Node::crop("leaf_b", "leaf_crop", "container", region(0.7)))
            .unwrap();
        graph.insert(Node::text("t1", "text_label", "leaf_a", "First text")).unwrap();
        graph.insert(Node::text("t2", "text_label", "t1", "Deepest text")).unwrap();
        graph
    }

    #[test]
    fn unknown_id_has_no_value() {
        let result = compute_display_value(&sample_graph(), "does_not_exist").unwrap();
        assert_eq!(result.value, None);
        assert_eq!(result.rule, DisplayRule::NotFound);
        assert!(result.reason.contains("not found"));
    }

    #[test]
    fn image_is_blank_and_locked() {
        let result = compute_display_value(&sample_graph(), "img_001").unwrap();
        assert_eq!(result.value.as_deref(), Some(""));
        assert!(result.locked);
        assert!(result.crop_region.is_none());
        assert!(result.reason.contains("Image type"));
    }

    #[test]
    fn leaf_crop_shows_text_child() {
        let result = compute_display_value(&sample_graph(), "crop_001").unwrap();
        assert_eq!(result.value.as_deref(), Some("Hello World"));
        assert_eq!(result.source_id, Some(NodeId::from("text_001")));
        assert_eq!(result.crop_region, Some(region(0.5)));
        assert!(!result.locked);
    }

    #[test]
    fn container_crop_is_blank_and_locked() {
        let result = compute_display_value(&complex_graph(), "container").unwrap();
        assert!(result.is_blank());
        assert!(result.locked);
        assert!(result.crop_region.is_some());
        assert!(result.reason.contains("container crop"));
    }

    #[test]
    fn leaf_crop_follows_correction_chain() {
        let result = compute_display_value(&complex_graph(), "leaf_a").unwrap();
        assert_eq!(result.value.as_deref(), Some("Deepest text"));
        assert_eq!(result.source_id, Some(NodeId::from("t2")));
        assert_eq!(result.rule, DisplayRule::LeafCropWithText);
    }

    #[test]
    fn leaf_crop_without_text_is_blank_and_editable() {
        let result = compute_display_value(&complex_graph(), "leaf_b").unwrap();
        assert!(result.is_blank());
        assert!(!result.locked);
        assert!(result.source_id.is_none());
        assert_eq!(result.crop_region, Some(region(0.7)));
        assert!(result.reason.contains("no text child"));
    }

    #[test]
    fn text_shows_its_own_data() {
        let result = compute_display_value(&complex_graph(), "t1").unwrap();
        assert_eq!(result.value.as_deref(), Some("First text"));
        assert_eq!(result.source_id, Some(NodeId::from("t1")));
        assert!(result.crop_region.is_none());
        assert!(!result.locked);
    }

    #[test]
    fn unknown_type_is_blank() {
        let mut graph = sample_graph();
        let fields: serde_yaml::Mapping =
            serde_yaml::from_str("type: collectra.Barcode\nid: bc\nparents: crop_001\ndata: '123'\n").unwrap();
        graph.add_node("barcodes", &fields).unwrap();

        let result = compute_display_value(&graph, "bc").unwrap();
        assert!(result.is_blank());
        assert!(!result.locked);
        assert!(result.reason.contains("unknown type"));
    }

    #[test]
    fn first_text_child_wins() {
        let mut graph = sample_graph();
        graph
            .insert(Node::text("text_002", "text_label", "crop_001", "Second child"))
            .unwrap();
        let result = compute_display_value(&graph, "crop_001").unwrap();
        assert_eq!(result.source_id, Some(NodeId::from("text_001")));
    }

    #[test]
    fn container_rule_beats_text_rule() {
        let mut graph = sample_graph();
        graph
            .insert(Node::crop("inner", "crop_label", "crop_001", region(0.4)))
            .unwrap();
        let result = compute_display_value(&graph, "crop_001").unwrap();
        assert_eq!(result.rule, DisplayRule::ContainerCrop);
    }

    #[test]
    fn cyclic_text_chain_is_an_invariant_violation() {
        let mut graph = sample_graph();
        graph
            .insert(Node::crop("crop_x", "crop_label", "img_001", region(0.5)))
            .unwrap();
        graph
            .insert(Node::text("loop_c", "text_label", "crop_x", "c").with_parent("loop_d"))
            .unwrap();
        graph.insert(Node::text("loop_d", "text_label", "loop_c", "d")).unwrap();

        // loop_c -> loop_d -> loop_c never reaches a terminal node
        assert!(matches!(
            compute_display_value(&graph, "crop_x"),
            Err(CollectraError::InvariantViolation(_))
        ));
    }
}
