//! Depth-first traversal restricted to one node kind.
//!
//! Used to follow chains of same-kind nodes, such as a Text that is
//! corrected by a child Text, which is in turn corrected by another.

use std::collections::HashSet;

use super::graph::AnnotationGraph;
use super::ids::NodeId;
use super::node_type::NodeKind;

impl AnnotationGraph {
    /// Leaves of the subgraph reachable from `start` through children of
    /// `kind`.
    ///
    /// A node is a leaf when it has no children of `kind`, whatever other
    /// children it has. Leaves are returned in discovery order. The walk uses
    /// an explicit stack, so among several matching children the one inserted
    /// last is explored first. An unknown `start` yields no leaves.
    pub fn dfs_leaves(&self, start: &str, kind: NodeKind) -> Vec<&NodeId> {
        let Some(start) = self.node_index(start) else {
            return Vec::new();
        };

        let mut leaves = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }

            let before = stack.len();
            stack.extend(self.typed_children(idx, kind));
            if stack.len() == before {
                leaves.extend(self.vertex_id(idx));
            }
        }

        leaves
    }

    /// The first leaf of [`dfs_leaves`](Self::dfs_leaves), if any.
    ///
    /// `None` when `start` is unknown, or when every path loops back into
    /// itself.
    pub fn find_deepest(&self, start: &str, kind: NodeKind) -> Option<&NodeId> {
        self.dfs_leaves(start, kind).into_iter().next()
    }
}
