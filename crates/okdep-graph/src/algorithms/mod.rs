//! Graph algorithms over the deduplicated, internal-only adjacency.
//!
//! Every function here is pure: it reads the node array and an [`Adjacency`]
//! and returns a fresh value. External edges never take part.

mod aggregate;
mod closure;
mod cycles;
mod mesh;

pub use aggregate::build_aggregates;
pub use closure::compute_closure_sizes;
pub use cycles::find_cycles;
pub use mesh::{DEFAULT_MESH_PERCENTILE, find_mesh_nodes, percentile_value, rank_percentile};

use crate::report::{DependencyEdge, NodeId};

/// Outbound internal targets per node, one entry per deduplicated edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    targets: Vec<Vec<NodeId>>,
}

impl Adjacency {
    /// Build the adjacency for `node_count` nodes, dropping external edges and
    /// edges whose endpoints fall outside `[0, node_count)`.
    pub fn from_edges(node_count: usize, edges: &[DependencyEdge]) -> Self {
        let mut targets = vec![Vec::new(); node_count];
        for edge in edges {
            let Some(to) = edge.internal_target() else {
                continue;
            };
            if (to as usize) >= node_count {
                continue;
            }
            if let Some(list) = targets.get_mut(edge.from as usize) {
                list.push(to);
            }
        }
        Self { targets }
    }

    pub fn node_count(&self) -> usize {
        self.targets.len()
    }

    pub fn edge_count(&self) -> usize {
        self.targets.iter().map(Vec::len).sum()
    }

    pub fn targets(&self, node: NodeId) -> &[NodeId] {
        self.targets
            .get(node as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_self_loop(&self, node: NodeId) -> bool {
        self.targets(node).contains(&node)
    }

    /// All `(from, to)` pairs in node order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.targets.iter().enumerate().flat_map(|(from, list)| {
            list.iter().map(move |&to| (from as NodeId, to))
        })
    }
}
