//! Circular dependency detection.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::Adjacency;
use crate::report::{CycleGroup, FileNode, NodeId};

/// Report every strongly-connected component of size >= 2, plus single nodes
/// that import themselves.
///
/// Groups are sorted by descending size, ties broken by their smallest member;
/// members are ascending and group ids follow the final order.
pub fn find_cycles(nodes: &[FileNode], adjacency: &Adjacency) -> Vec<CycleGroup> {
    let node_count = nodes.len();
    let mut graph: DiGraph<(), (), u32> =
        DiGraph::with_capacity(node_count, adjacency.edge_count());
    for _ in 0..node_count {
        graph.add_node(());
    }
    for (from, to) in adjacency.edges() {
        let (from, to) = (from as usize, to as usize);
        if from < node_count && to < node_count {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
    }

    // petgraph's Tarjan is iterative, so deep import chains cannot overflow the stack.
    let mut groups: Vec<Vec<NodeId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|index| adjacency.has_self_loop(index.index() as NodeId))
        })
        .map(|component| {
            let mut ids: Vec<NodeId> = component
                .iter()
                .map(|index| index.index() as NodeId)
                .collect();
            ids.sort_unstable();
            ids
        })
        .collect();

    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));

    groups
        .into_iter()
        .enumerate()
        .map(|(id, node_ids)| CycleGroup {
            id: id as u32,
            size: node_ids.len(),
            node_ids,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DependencyEdge, EdgeKind};

    fn nodes(count: u32) -> Vec<FileNode> {
        (0..count)
            .map(|id| FileNode::new(id, format!("n{id}.ts"), ".ts", 1))
            .collect()
    }

    fn adjacency(count: usize, pairs: &[(NodeId, NodeId)]) -> Adjacency {
        let edges: Vec<DependencyEdge> = pairs
            .iter()
            .map(|&(from, to)| DependencyEdge::internal(from, to, EdgeKind::Static))
            .collect();
        Adjacency::from_edges(count, &edges)
    }

    #[test]
    fn two_node_cycle_excludes_tail() {
        let cycles = find_cycles(&nodes(3), &adjacency(3, &[(0, 1), (1, 0), (1, 2)]));

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].node_ids, vec![0, 1]);
        assert_eq!(cycles[0].size, 2);
        assert_eq!(cycles[0].id, 0);
    }

    #[test]
    fn self_loop_is_a_cycle_of_one() {
        let cycles = find_cycles(&nodes(2), &adjacency(2, &[(1, 1), (0, 1)]));

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].node_ids, vec![1]);
        assert_eq!(cycles[0].size, 1);
    }

    #[test]
    fn acyclic_graph_has_no_groups() {
        let cycles = find_cycles(&nodes(4), &adjacency(4, &[(0, 1), (1, 2), (0, 3), (3, 2)]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn groups_sorted_by_size_then_member() {
        // {5,6} , {0,1,2} , {3} self-loop, {7,8}
        let cycles = find_cycles(
            &nodes(9),
            &adjacency(
                9,
                &[
                    (5, 6),
                    (6, 5),
                    (0, 1),
                    (1, 2),
                    (2, 0),
                    (3, 3),
                    (8, 7),
                    (7, 8),
                    (4, 0),
                ],
            ),
        );

        let members: Vec<Vec<NodeId>> = cycles.iter().map(|c| c.node_ids.clone()).collect();
        assert_eq!(members, vec![vec![0, 1, 2], vec![5, 6], vec![7, 8], vec![3]]);
        let ids: Vec<u32> = cycles.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let count = 50_000u32;
        let mut pairs: Vec<(NodeId, NodeId)> = (0..count - 1).map(|i| (i, i + 1)).collect();
        pairs.push((count - 1, 0));

        let cycles = find_cycles(&nodes(count), &adjacency(count as usize, &pairs));

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].size, count as usize);
    }
}
