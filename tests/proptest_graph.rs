use collectra::ir::io_yaml::{from_yaml_str, to_yaml_string};
use collectra::ir::NodeKind;
use collectra::resolve::{compute_display_value, DisplayRule};
use proptest::prelude::*;
use proptest::sample::Index;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn yaml_roundtrip_preserves_node_tuples(graph in proptest_helpers::arb_graph(6, 10)) {
        let yaml = to_yaml_string(&graph).expect("serialize document");
        let restored = from_yaml_str(&yaml).expect("parse document");

        prop_assert_eq!(
            proptest_helpers::node_tuples(&graph),
            proptest_helpers::node_tuples(&restored)
        );
        prop_assert_eq!(graph.edge_count(), restored.edge_count());
    }

    #[test]
    fn yaml_roundtrip_is_idempotent(graph in proptest_helpers::arb_graph(6, 10)) {
        let first = to_yaml_string(&graph).expect("serialize first pass");
        let second = to_yaml_string(&from_yaml_str(&first).expect("parse first pass"))
            .expect("serialize second pass");

        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_node_resolves_by_its_rule(graph in proptest_helpers::arb_graph(6, 10)) {
        for node in graph.nodes() {
            let id = node.id().as_str();
            let result = compute_display_value(&graph, id).expect("resolve");

            match node.kind() {
                NodeKind::Image => {
                    prop_assert!(result.is_blank());
                    prop_assert!(result.locked);
                }
                NodeKind::ImageCrop => {
                    prop_assert!(result.crop_region.is_some());
                    let has_crop_children =
                        !graph.children_of_type(id, NodeKind::ImageCrop).unwrap().is_empty();
                    let has_text_children =
                        !graph.children_of_type(id, NodeKind::Text).unwrap().is_empty();

                    if has_crop_children {
                        prop_assert_eq!(result.rule, DisplayRule::ContainerCrop);
                        prop_assert!(result.is_blank());
                        prop_assert!(result.locked);
                    } else if has_text_children {
                        // the source is a terminal Text whose data is shown
                        let source = result.source_id.clone().expect("source id");
                        let source_node = graph.get(source.as_str()).expect("source node");
                        prop_assert!(source_node.node_type().is_a(NodeKind::Text));
                        prop_assert!(graph.children_of_type(source.as_str(), NodeKind::Text).unwrap().is_empty());
                        prop_assert_eq!(result.value.as_deref(), Some(source_node.data()));
                        prop_assert!(!result.locked);
                    } else {
                        prop_assert!(result.is_blank());
                        prop_assert!(!result.locked);
                        prop_assert!(result.source_id.is_none());
                    }
                }
                NodeKind::Text => {
                    prop_assert_eq!(result.value.as_deref(), Some(node.data()));
                    prop_assert_eq!(result.source_id.as_ref(), Some(node.id()));
                }
                NodeKind::Other => prop_assert!(result.is_blank()),
            }
        }
    }

    #[test]
    fn removing_a_node_drops_every_incident_edge(
        graph in proptest_helpers::arb_graph(6, 10),
        pick in any::<Index>(),
    ) {
        let mut graph = graph;
        let ids: Vec<String> = graph.nodes().map(|n| n.id().to_string()).collect();
        let victim = &ids[pick.index(ids.len())];
        let before = graph.edge_count();
        let incident = graph.children(victim).unwrap().len() + graph.parents(victim).unwrap().len();

        graph.remove_node(victim).expect("remove node");

        prop_assert!(graph.get(victim).is_none());
        prop_assert_eq!(graph.edge_count(), before - incident);
        for node in graph.nodes() {
            let id = node.id().as_str();
            prop_assert!(graph.children(id).unwrap().iter().all(|c| c.as_str() != victim));
            prop_assert!(graph.parents(id).unwrap().iter().all(|p| p.as_str() != victim));
        }
        prop_assert!(graph.verify_adjacency().is_ok());
    }
}
