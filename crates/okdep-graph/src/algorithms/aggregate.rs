//! Directory-level rollup of the file graph.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::Adjacency;
use crate::path::aggregate_key;
use crate::report::{AggregateEdge, AggregateGraph, AggregateNode, FileNode};

/// Group nodes by the first `depth` segments of their relative path and
/// collapse internal edges between distinct groups into weighted edges.
///
/// Nodes come out sorted by key. Edges are sorted by weight, heaviest first,
/// then by `(from, to)`. Edges inside one group are dropped.
pub fn build_aggregates(nodes: &[FileNode], adjacency: &Adjacency, depth: usize) -> AggregateGraph {
    let keys: Vec<String> = nodes
        .iter()
        .map(|node| aggregate_key(&node.path, depth))
        .collect();

    let mut groups: BTreeMap<&str, AggregateNode> = BTreeMap::new();
    for (node, key) in nodes.iter().zip(&keys) {
        let group = groups
            .entry(key.as_str())
            .or_insert_with(|| AggregateNode::new(key));
        group.file_count += 1;
        group.size_bytes += node.size_bytes;
    }

    let mut weights: FxHashMap<(&str, &str), u32> = FxHashMap::default();
    for (from, to) in adjacency.edges() {
        let (Some(from_key), Some(to_key)) = (keys.get(from as usize), keys.get(to as usize))
        else {
            continue;
        };
        if from_key == to_key {
            continue;
        }
        *weights.entry((from_key.as_str(), to_key.as_str())).or_insert(0) += 1;
    }

    let mut edges: Vec<AggregateEdge> = weights
        .into_iter()
        .map(|((from, to), weight)| AggregateEdge {
            from: from.to_string(),
            to: to.to_string(),
            weight,
        })
        .collect();
    edges.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.from.cmp(&b.from))
            .then_with(|| a.to.cmp(&b.to))
    });

    AggregateGraph {
        nodes: groups.into_values().collect(),
        edges,
        depth,
    }
}
