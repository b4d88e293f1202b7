//! Transitive dependency weight per node.

use std::collections::BTreeMap;

use rayon::prelude::*;

use super::Adjacency;
use crate::report::{FileNode, NodeId};

/// Per-worker traversal state reused across start nodes.
///
/// `visited[n] == stamp` marks `n` as seen in the current traversal, so the
/// buffer never needs clearing between start nodes.
struct Walk {
    visited: Vec<u32>,
    stamp: u32,
    stack: Vec<NodeId>,
}

impl Walk {
    fn new(node_count: usize) -> Self {
        Self {
            visited: vec![0; node_count],
            stamp: 0,
            stack: Vec::new(),
        }
    }

    fn next_stamp(&mut self) -> u32 {
        if self.stamp == u32::MAX {
            self.visited.fill(0);
            self.stamp = 0;
        }
        self.stamp += 1;
        self.stamp
    }
}

/// For every node, the summed `size_bytes` of itself and everything reachable
/// from it through internal edges. Each reachable node is counted once.
///
/// Traversals are independent, so they run in parallel; the result is keyed
/// by node id and therefore independent of scheduling.
pub fn compute_closure_sizes(nodes: &[FileNode], adjacency: &Adjacency) -> BTreeMap<NodeId, u64> {
    let node_count = nodes.len();

    (0..node_count)
        .into_par_iter()
        .map_init(
            || Walk::new(node_count),
            |walk, start| {
                let stamp = walk.next_stamp();
                let mut total = 0u64;

                walk.stack.clear();
                walk.stack.push(start as NodeId);
                walk.visited[start] = stamp;

                while let Some(current) = walk.stack.pop() {
                    total += nodes[current as usize].size_bytes;
                    for &next in adjacency.targets(current) {
                        let index = next as usize;
                        if index < node_count && walk.visited[index] != stamp {
                            walk.visited[index] = stamp;
                            walk.stack.push(next);
                        }
                    }
                }

                (nodes[start].id, total)
            },
        )
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
