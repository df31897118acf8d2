//! Fuzz target for annotation document parsing.
//!
//! Feeds arbitrary bytes to the YAML document reader and, when a graph comes
//! out, resolves every node in it.

#![no_main]

use collectra::ir::io_yaml::from_yaml_slice;
use collectra::resolve::compute_display_value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    if let Ok(graph) = from_yaml_slice(data) {
        for node in graph.nodes() {
            let _ = compute_display_value(&graph, node.id().as_str());
        }
        let _ = graph.verify_adjacency();
    }
});
