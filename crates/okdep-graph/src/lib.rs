//! # okdep-graph
//!
//! Pure data model and algorithms for file-level dependency graphs.
//!
//! This crate does no I/O. It takes a node array plus deduplicated edges and
//! derives the structural views that the analyzer publishes:
//!
//! - **Cycles**: strongly-connected components of size >= 2, plus self-imports
//! - **Mesh**: nodes in the top percentile of both fan-in and fan-out
//! - **Closure sizes**: summed bytes of everything reachable from each node
//! - **Aggregates**: a directory-level rollup with weighted edges
//!
//! ## Quick Start
//!
//! ```rust
//! use okdep_graph::algorithms::{Adjacency, compute_closure_sizes, find_cycles};
//! use okdep_graph::{DependencyEdge, EdgeKind, FileNode, apply_degrees, deduplicate_edges};
//!
//! let mut nodes = vec![
//!     FileNode::new(0, "src/a.ts", ".ts", 100),
//!     FileNode::new(1, "src/b.ts", ".ts", 200),
//! ];
//! let edges = deduplicate_edges([
//!     DependencyEdge::internal(0, 1, EdgeKind::Static),
//!     DependencyEdge::internal(0, 1, EdgeKind::Static),
//!     DependencyEdge::internal(1, 0, EdgeKind::Dynamic),
//! ]);
//! apply_degrees(&mut nodes, &edges);
//!
//! let adjacency = Adjacency::from_edges(nodes.len(), &edges);
//! assert_eq!(find_cycles(&nodes, &adjacency).len(), 1);
//! assert_eq!(compute_closure_sizes(&nodes, &adjacency)[&0], 300);
//! ```

pub mod algorithms;
pub mod edges;
pub mod path;
pub mod report;

pub use edges::{apply_degrees, deduplicate_edges};
pub use report::{
    AggregateEdge, AggregateGraph, AggregateNode, AnalysisReport, AnalysisWarning, CycleGroup,
    DependencyEdge, EXTERNAL_TARGET, EdgeKind, FileNode, MeshNode, NodeId, REPORT_VERSION,
    ReportMeta, ReportSummary, WarningKind,
};
