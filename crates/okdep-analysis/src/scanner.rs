//! File scanning: node assignment, reference extraction and resolution.
//!
//! Node ids are assigned sequentially from the enumeration order before any
//! parsing starts. Per-file work then runs on the rayon pool and lands in a
//! slot per node, so the merged output never depends on scheduling.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use okdep_graph::path::{SUPPORTED_EXTENSIONS, extension_of, normalize_absolute, relative_path};
use okdep_graph::{AnalysisWarning, DependencyEdge, FileNode, NodeId};
use path_clean::PathClean;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::cache::{FileStamp, ScanCache};
use crate::parser::{ParsedImport, parse_imports};
use crate::resolution::{ResolutionContext, is_relative_or_absolute};

/// How many files were parsed, served from cache, or could not be processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub parsed: usize,
    pub reused: usize,
    pub failed: usize,
}

/// Everything a scan produces. `edges` are raw candidates, not deduplicated.
#[derive(Debug)]
pub struct ScanOutput {
    pub nodes: Vec<FileNode>,
    pub edges: Vec<DependencyEdge>,
    pub warnings: Vec<AnalysisWarning>,
    /// Cache table for the next run.
    pub cache: ScanCache,
    pub stats: ScanStats,
}

/// A file that passed the stat phase.
struct Candidate {
    abs_path: PathBuf,
    stamp: FileStamp,
}

enum Source {
    Reused,
    Parsed,
    Failed,
}

/// Result of processing one node.
struct NodeScan {
    source: Source,
    edges: Vec<DependencyEdge>,
    external_refs: u32,
    warnings: Vec<AnalysisWarning>,
    /// References to store in the next cache, when the file may be cached.
    cacheable: Option<Vec<ParsedImport>>,
}

impl NodeScan {
    fn failed(warning: AnalysisWarning) -> Self {
        Self {
            source: Source::Failed,
            edges: Vec::new(),
            external_refs: 0,
            warnings: vec![warning],
            cacheable: None,
        }
    }
}

/// Scans a fixed file list against a resolution context.
pub struct Scanner<'a> {
    root: &'a Path,
    context: &'a ResolutionContext,
    resolve_aliases: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(root: &'a Path, context: &'a ResolutionContext) -> Self {
        Self {
            root,
            context,
            resolve_aliases: true,
        }
    }

    /// Classify bare specifiers matching tsconfig `paths` as internal.
    pub fn with_resolve_aliases(mut self, enabled: bool) -> Self {
        self.resolve_aliases = enabled;
        self
    }

    /// Scan `files` (absolute, in their final order). `previous` entries are
    /// reused when a file's modification time and size are unchanged.
    pub fn scan(&self, files: &[PathBuf], previous: Option<&ScanCache>) -> ScanOutput {
        let mut warnings = Vec::new();

        let stats: Vec<_> = files
            .par_iter()
            .map(|path| fs::metadata(path).map(|metadata| FileStamp::from_metadata(&metadata)))
            .collect();

        let mut nodes = Vec::with_capacity(files.len());
        let mut candidates = Vec::with_capacity(files.len());
        for (path, stat) in files.iter().zip(stats) {
            let abs_path = path.clean();
            let relative = relative_path(self.root, &abs_path);
            match stat {
                Ok(stamp) => {
                    let id = nodes.len() as NodeId;
                    nodes.push(FileNode::new(id, relative, extension_of(&abs_path), stamp.size));
                    candidates.push(Candidate { abs_path, stamp });
                }
                Err(error) => {
                    warnings.push(AnalysisWarning::skip(relative, format!("stat failed: {error}")));
                }
            }
        }

        let path_to_id: FxHashMap<&Path, NodeId> = candidates
            .iter()
            .enumerate()
            .map(|(id, candidate)| (candidate.abs_path.as_path(), id as NodeId))
            .collect();

        let scans: Vec<NodeScan> = candidates
            .par_iter()
            .zip(nodes.par_iter())
            .map(|(candidate, node)| self.scan_node(candidate, node, previous, &path_to_id))
            .collect();

        let mut edges = Vec::new();
        let mut cache = ScanCache::new();
        let mut stats = ScanStats::default();
        for ((scan, node), candidate) in scans.into_iter().zip(nodes.iter_mut()).zip(&candidates) {
            match scan.source {
                Source::Reused => stats.reused += 1,
                Source::Parsed => stats.parsed += 1,
                Source::Failed => stats.failed += 1,
            }
            node.external_refs_count = scan.external_refs;
            edges.extend(scan.edges);
            warnings.extend(scan.warnings);
            if let Some(imports) = scan.cacheable {
                cache.insert(cache_key(&candidate.abs_path), candidate.stamp, imports);
            }
        }

        tracing::debug!(
            nodes = nodes.len(),
            candidates = edges.len(),
            parsed = stats.parsed,
            reused = stats.reused,
            failed = stats.failed,
            "Scan completed"
        );

        ScanOutput {
            nodes,
            edges,
            warnings,
            cache,
            stats,
        }
    }

    fn scan_node(
        &self,
        candidate: &Candidate,
        node: &FileNode,
        previous: Option<&ScanCache>,
        path_to_id: &FxHashMap<&Path, NodeId>,
    ) -> NodeScan {
        let cached = previous
            .and_then(|cache| cache.lookup(&cache_key(&candidate.abs_path), candidate.stamp));

        let (source, imports) = match cached {
            Some(imports) => (Source::Reused, imports.to_vec()),
            None => {
                // Decoded lossily; a stray Latin-1 byte in a comment is common.
                let text = match fs::read(&candidate.abs_path) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(error) => {
                        return NodeScan::failed(AnalysisWarning::skip(
                            &node.path,
                            format!("read failed: {error}"),
                        ));
                    }
                };
                match parse_imports(&candidate.abs_path, &text) {
                    Ok(imports) => (Source::Parsed, imports),
                    Err(error) => {
                        return NodeScan::failed(AnalysisWarning::fallback(
                            &node.path,
                            format!("parse failed: {error}"),
                        ));
                    }
                }
            }
        };

        let mut scan = NodeScan {
            source,
            edges: Vec::with_capacity(imports.len()),
            external_refs: 0,
            warnings: Vec::new(),
            cacheable: None,
        };

        for import in &imports {
            let kind = import.effective_kind();
            let specifier = import.import_path.as_str();

            if !self.is_internal(specifier) {
                scan.edges.push(DependencyEdge::external(node.id, kind));
                scan.external_refs += 1;
                continue;
            }

            match self.resolve_internal(specifier, &candidate.abs_path, path_to_id) {
                Some(target) => {
                    tracing::trace!(from = %node.path, specifier, to = target, "Resolved reference");
                    scan.edges.push(DependencyEdge::internal(node.id, target, kind));
                }
                None => {
                    scan.warnings.push(AnalysisWarning::unresolved(&node.path, specifier));
                }
            }
        }

        scan.cacheable = Some(imports);
        scan
    }

    fn is_internal(&self, specifier: &str) -> bool {
        is_relative_or_absolute(specifier)
            || (self.resolve_aliases && self.context.matches_alias(specifier))
    }

    /// Fast candidate guessing first, then the full resolver.
    fn resolve_internal(
        &self,
        specifier: &str,
        containing_file: &Path,
        path_to_id: &FxHashMap<&Path, NodeId>,
    ) -> Option<NodeId> {
        let dir = containing_file.parent().unwrap_or(self.root);

        if is_relative_or_absolute(specifier) {
            let hit = fast_candidates(dir, specifier)
                .iter()
                .find_map(|candidate| path_to_id.get(candidate.as_path()).copied());
            if hit.is_some() {
                return hit;
            }
        }

        let resolved = self.context.resolve(specifier, containing_file)?;
        path_to_id.get(resolved.as_path()).copied()
    }
}

/// Cache key for an absolute path.
fn cache_key(abs_path: &Path) -> String {
    abs_path.to_string_lossy().into_owned()
}

/// Paths a relative or absolute specifier most likely names: the path itself
/// when it has an extension, otherwise `<target>.<ext>` then
/// `<target>/index.<ext>` for every analyzable extension.
pub fn fast_candidates(dir: &Path, specifier: &str) -> Vec<PathBuf> {
    let target = normalize_absolute(Path::new(specifier), dir);
    if target.extension().is_some() {
        return vec![target];
    }

    let with_extension = SUPPORTED_EXTENSIONS.iter().map(|ext| {
        let mut raw: OsString = target.clone().into_os_string();
        raw.push(ext);
        PathBuf::from(raw)
    });
    let index_files = SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| target.join(format!("index{ext}")));

    with_extension.chain(index_files).collect()
}
