//! Fan-in/fan-out hotspot ("mesh") detection.

use crate::report::{FileNode, MeshNode};

/// Percentile used when the caller does not choose one.
pub const DEFAULT_MESH_PERCENTILE: f64 = 90.0;

/// Nodes whose in-degree and out-degree both reach the `percentile`-th
/// percentile of their distributions, highest score first.
///
/// The score is `(in / max_in) * (out / max_out)` with both maxima taken over
/// every node and floored at 1.
pub fn find_mesh_nodes(nodes: &[FileNode], percentile: f64) -> Vec<MeshNode> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut in_values: Vec<u32> = nodes.iter().map(|node| node.in_degree).collect();
    let mut out_values: Vec<u32> = nodes.iter().map(|node| node.out_degree).collect();
    in_values.sort_unstable();
    out_values.sort_unstable();

    let in_threshold = percentile_value(&in_values, percentile);
    let out_threshold = percentile_value(&out_values, percentile);
    let max_in = f64::from(in_values.last().copied().unwrap_or(0).max(1));
    let max_out = f64::from(out_values.last().copied().unwrap_or(0).max(1));

    let mut mesh: Vec<MeshNode> = nodes
        .iter()
        .filter(|node| node.in_degree >= in_threshold && node.out_degree >= out_threshold)
        .map(|node| MeshNode {
            node_id: node.id,
            in_degree: node.in_degree,
            out_degree: node.out_degree,
            score: (f64::from(node.in_degree) / max_in) * (f64::from(node.out_degree) / max_out),
            percentile_in: rank_percentile(&in_values, node.in_degree),
            percentile_out: rank_percentile(&out_values, node.out_degree),
        })
        .collect();

    mesh.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    mesh
}

/// Rank-based percentile of an ascending slice: the value at index
/// `floor(p / 100 * (len - 1))`.
pub fn percentile_value(sorted: &[u32], percentile: f64) -> u32 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0;
    };
    let fraction = if percentile.is_finite() {
        percentile.clamp(0.0, 100.0) / 100.0
    } else {
        1.0
    };
    let index = (fraction * last as f64).floor() as usize;
    sorted[index.min(last)]
}

/// Share of values `<= value`, as a percentage of an ascending slice.
pub fn rank_percentile(sorted: &[u32], value: u32) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let at_or_below = sorted.partition_point(|&current| current <= value);
    at_or_below as f64 / sorted.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32, in_degree: u32, out_degree: u32) -> FileNode {
        let mut node = FileNode::new(id, format!("n{id}.ts"), ".ts", 1);
        node.in_degree = in_degree;
        node.out_degree = out_degree;
        node
    }

    #[test]
    fn dominant_node_ranks_first() {
        let nodes = vec![node(0, 1, 1), node(1, 1, 2), node(2, 1, 0)];
        let mesh = find_mesh_nodes(&nodes, 50.0);

        assert_eq!(mesh.len(), 2);
        assert_eq!(mesh[0].node_id, 1);
        assert!((mesh[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(mesh[1].node_id, 0);
        assert!((mesh[1].score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn below_threshold_nodes_are_excluded() {
        let mut nodes: Vec<FileNode> = (0..9).map(|id| node(id, 1, 1)).collect();
        nodes.push(node(9, 10, 10));
        // High fan-in, low fan-out: below the out-degree threshold.
        nodes.push(node(10, 10, 0));

        let mesh = find_mesh_nodes(&nodes, 90.0);

        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh[0].node_id, 9);
        assert!((mesh[0].score - 1.0).abs() < f64::EPSILON);
        assert!((mesh[0].percentile_in - 100.0).abs() < f64::EPSILON);
        assert!(!mesh.iter().any(|item| item.node_id == 10));
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let nodes: Vec<FileNode> = (0..20).map(|id| node(id, id % 7, (id * 3) % 5)).collect();
        for item in find_mesh_nodes(&nodes, 0.0) {
            assert!((0.0..=1.0).contains(&item.score));
            assert!((0.0..=100.0).contains(&item.percentile_in));
            assert!((0.0..=100.0).contains(&item.percentile_out));
        }
    }

    #[test]
    fn percentile_helpers() {
        let values = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(percentile_value(&values, 90.0), 8);
        assert_eq!(percentile_value(&values, 100.0), 9);
        assert_eq!(percentile_value(&values, 0.0), 0);
        assert_eq!(percentile_value(&[], 50.0), 0);
        assert!((rank_percentile(&values, 4) - 50.0).abs() < f64::EPSILON);
        assert!((rank_percentile(&[1, 1, 1], 1) - 100.0).abs() < f64::EPSILON);
        assert_eq!(rank_percentile(&[], 3), 0.0);
    }

    #[test]
    fn empty_input_yields_no_mesh() {
        assert!(find_mesh_nodes(&[], 90.0).is_empty());
    }
}
