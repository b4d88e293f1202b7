//! Report data model.
//!
//! These types are the serialized contract between the analyzer and every
//! downstream consumer (printers, persisted report files, viewers). Field
//! names serialize in camelCase.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Format version written into [`ReportMeta::version`].
pub const REPORT_VERSION: &str = "0.1.0";

/// Serialized destination of an edge that points outside the project.
pub const EXTERNAL_TARGET: i64 = -1;

/// Dense node identifier in `[0, node_count)`.
pub type NodeId = u32;

/// How one module references another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// `import ... from`, side-effect imports and `require` calls.
    Static,
    /// `import(...)` expressions.
    Dynamic,
    /// `export ... from` and `export * from`.
    Reexport,
    /// References that only carry types.
    TypeOnly,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Static => "static",
            EdgeKind::Dynamic => "dynamic",
            EdgeKind::Reexport => "reexport",
            EdgeKind::TypeOnly => "typeOnly",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scanned source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: NodeId,
    /// Project-relative, `/`-separated path.
    pub path: String,
    /// Lowercase extension including the dot.
    pub ext: String,
    pub size_bytes: u64,
    pub in_degree: u32,
    pub out_degree: u32,
    /// Hotspot score, zero unless the node qualifies as a mesh node.
    pub mesh_score: f64,
    pub external_refs_count: u32,
}

impl FileNode {
    pub fn new(id: NodeId, path: impl Into<String>, ext: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id,
            path: path.into(),
            ext: ext.into(),
            size_bytes,
            in_degree: 0,
            out_degree: 0,
            mesh_score: 0.0,
            external_refs_count: 0,
        }
    }
}

/// One reference from a file to another file or to an external package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: NodeId,
    /// Destination node; `None` for external references (serialized as `-1`).
    #[serde(with = "external_sentinel")]
    pub to: Option<NodeId>,
    pub kind: EdgeKind,
    pub external: bool,
}

impl DependencyEdge {
    pub fn internal(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self {
            from,
            to: Some(to),
            kind,
            external: false,
        }
    }

    pub fn external(from: NodeId, kind: EdgeKind) -> Self {
        Self {
            from,
            to: None,
            kind,
            external: true,
        }
    }

    /// Destination of an internal edge, `None` for external references.
    pub fn internal_target(&self) -> Option<NodeId> {
        if self.external { None } else { self.to }
    }
}

mod external_sentinel {
    use super::*;

    pub fn serialize<S: Serializer>(to: &Option<NodeId>, serializer: S) -> Result<S::Ok, S::Error> {
        match to {
            Some(id) => serializer.serialize_i64(i64::from(*id)),
            None => serializer.serialize_i64(EXTERNAL_TARGET),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NodeId>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            return Ok(None);
        }
        NodeId::try_from(raw)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

/// A strongly-connected component that represents a circular dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleGroup {
    pub id: u32,
    /// Member node ids, ascending.
    pub node_ids: Vec<NodeId>,
    pub size: usize,
}

/// A fan-in/fan-out hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshNode {
    pub node_id: NodeId,
    pub in_degree: u32,
    pub out_degree: u32,
    /// `(in / max_in) * (out / max_out)`, within `[0, 1]`.
    pub score: f64,
    pub percentile_in: f64,
    pub percentile_out: f64,
}

/// Directory-level rollup of file nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateNode {
    pub id: String,
    pub label: String,
    pub file_count: usize,
    pub size_bytes: u64,
}

impl AggregateNode {
    pub fn new(key: &str) -> Self {
        Self {
            id: key.to_string(),
            label: key.to_string(),
            file_count: 0,
            size_bytes: 0,
        }
    }
}

/// Weighted directory-to-directory relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEdge {
    pub from: String,
    pub to: String,
    /// Number of file-level edges collapsed into this one.
    pub weight: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateGraph {
    pub nodes: Vec<AggregateNode>,
    pub edges: Vec<AggregateEdge>,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    /// An internal reference that neither resolution pass could map to a node.
    Unresolved,
    /// A file whose source could not be parsed; treated as having no references.
    Fallback,
    /// A file that could not be stat'ed or read.
    Skip,
}

/// Non-fatal, per-file condition recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub file_path: String,
    pub detail: String,
}

impl AnalysisWarning {
    pub fn new(kind: WarningKind, file_path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            file_path: file_path.into(),
            detail: detail.into(),
        }
    }

    pub fn unresolved(file_path: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self::new(WarningKind::Unresolved, file_path, specifier)
    }

    pub fn fallback(file_path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(WarningKind::Fallback, file_path, detail)
    }

    pub fn skip(file_path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(WarningKind::Skip, file_path, detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub root: String,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub duration_ms: u64,
    pub file_count: usize,
    pub edge_count: usize,
    pub version: String,
}

/// The complete, immutable result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub nodes: Vec<FileNode>,
    pub edges: Vec<DependencyEdge>,
    pub cycles: Vec<CycleGroup>,
    pub mesh: Vec<MeshNode>,
    pub aggregates: AggregateGraph,
    pub closure_size_by_node: BTreeMap<NodeId, u64>,
    pub warnings: Vec<AnalysisWarning>,
}

impl AnalysisReport {
    pub fn node(&self, id: NodeId) -> Option<&FileNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_path(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.path.as_str())
    }

    /// Member paths of a cycle group, in member order.
    pub fn cycle_paths(&self, group: &CycleGroup) -> Vec<&str> {
        group
            .node_ids
            .iter()
            .filter_map(|id| self.node_path(*id))
            .collect()
    }

    /// The highest scoring hotspots paired with their file nodes.
    pub fn top_mesh(&self, limit: usize) -> Vec<(&MeshNode, &FileNode)> {
        self.mesh
            .iter()
            .filter_map(|item| self.node(item.node_id).map(|node| (item, node)))
            .take(limit)
            .collect()
    }

    pub fn warning_count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Human-readable run summary.
    pub fn summary(&self) -> ReportSummary<'_> {
        ReportSummary { report: self }
    }
}

/// Display adapter returned by [`AnalysisReport::summary`].
pub struct ReportSummary<'a> {
    report: &'a AnalysisReport,
}

impl fmt::Display for ReportSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "Dependency Analysis")?;
        writeln!(f, "===================")?;
        writeln!(f, "Root: {}", report.meta.root)?;
        writeln!(f, "Files: {}", report.meta.file_count)?;
        writeln!(f, "Edges: {}", report.meta.edge_count)?;
        writeln!(f, "Cycles: {}", report.cycles.len())?;
        writeln!(f, "Mesh nodes: {}", report.mesh.len())?;
        writeln!(
            f,
            "Warnings: {} (unresolved {}, fallback {}, skip {})",
            report.warnings.len(),
            report.warning_count(WarningKind::Unresolved),
            report.warning_count(WarningKind::Fallback),
            report.warning_count(WarningKind::Skip),
        )?;
        write!(f, "Duration: {}ms", report.meta.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kinds_serialize_as_report_strings() {
        let kinds: Vec<String> = [
            EdgeKind::Static,
            EdgeKind::Dynamic,
            EdgeKind::Reexport,
            EdgeKind::TypeOnly,
        ]
        .iter()
        .map(|kind| serde_json::to_string(kind).unwrap())
        .collect();

        assert_eq!(kinds, ["\"static\"", "\"dynamic\"", "\"reexport\"", "\"typeOnly\""]);
        assert_eq!(EdgeKind::TypeOnly.to_string(), "typeOnly");
    }

    #[test]
    fn external_edges_use_negative_sentinel() {
        let edge = DependencyEdge::external(3, EdgeKind::Static);
        let json = serde_json::to_value(edge).unwrap();
        assert_eq!(json["to"], -1);
        assert_eq!(json["external"], true);

        let back: DependencyEdge = serde_json::from_value(json).unwrap();
        assert_eq!(back.to, None);
        assert_eq!(back.internal_target(), None);

        let internal = DependencyEdge::internal(0, 2, EdgeKind::Dynamic);
        let json = serde_json::to_value(internal).unwrap();
        assert_eq!(json["to"], 2);
        assert_eq!(json["kind"], "dynamic");
    }

    #[test]
    fn warnings_serialize_with_type_key() {
        let warning = AnalysisWarning::unresolved("src/a.ts", "./missing");
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "unresolved");
        assert_eq!(json["filePath"], "src/a.ts");
        assert_eq!(json["detail"], "./missing");
    }

    #[test]
    fn closure_map_serializes_with_string_keys() {
        let mut closure = BTreeMap::new();
        closure.insert(0u32, 600u64);
        let report = AnalysisReport {
            meta: ReportMeta {
                root: "/p".into(),
                generated_at: "2024-01-01T00:00:00.000Z".into(),
                duration_ms: 1,
                file_count: 1,
                edge_count: 0,
                version: REPORT_VERSION.into(),
            },
            nodes: vec![FileNode::new(0, "a.ts", ".ts", 600)],
            edges: Vec::new(),
            cycles: Vec::new(),
            mesh: Vec::new(),
            aggregates: AggregateGraph::default(),
            closure_size_by_node: closure,
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["closureSizeByNode"]["0"], 600);
        assert_eq!(json["nodes"][0]["sizeBytes"], 600);
        assert_eq!(json["meta"]["fileCount"], 1);

        let back: AnalysisReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
        assert!(report.summary().to_string().contains("Files: 1"));
    }
}
