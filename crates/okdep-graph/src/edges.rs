//! Edge deduplication and degree bookkeeping.

use rustc_hash::FxHashSet;

use crate::report::{DependencyEdge, EdgeKind, FileNode, NodeId};

type DedupKey = (NodeId, Option<NodeId>, EdgeKind, bool);

fn dedup_key(edge: &DependencyEdge) -> DedupKey {
    (edge.from, edge.to, edge.kind, edge.external)
}

/// Collapse candidates sharing `(from, to, kind, external)`, keeping the first
/// occurrence and the original order.
pub fn deduplicate_edges(candidates: impl IntoIterator<Item = DependencyEdge>) -> Vec<DependencyEdge> {
    let mut seen: FxHashSet<DedupKey> = FxHashSet::default();
    candidates
        .into_iter()
        .filter(|edge| seen.insert(dedup_key(edge)))
        .collect()
}

/// Recompute in/out degrees from internal edges.
///
/// Edges pointing at ids outside `nodes` are ignored.
pub fn apply_degrees(nodes: &mut [FileNode], edges: &[DependencyEdge]) {
    for node in nodes.iter_mut() {
        node.in_degree = 0;
        node.out_degree = 0;
    }

    let len = nodes.len();
    for edge in edges {
        let Some(to) = edge.internal_target() else {
            continue;
        };
        let (from, to) = (edge.from as usize, to as usize);
        if from >= len || to >= len {
            continue;
        }
        nodes[from].out_degree += 1;
        nodes[to].in_degree += 1;
    }
}
