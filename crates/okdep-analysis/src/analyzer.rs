//! The analysis entry point.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use okdep_graph::algorithms::{
    Adjacency, build_aggregates, compute_closure_sizes, find_cycles, find_mesh_nodes,
};
use okdep_graph::path::to_posix;
use okdep_graph::{AnalysisReport, REPORT_VERSION, ReportMeta, apply_degrees, deduplicate_edges};

use crate::cache::ScanCache;
use crate::config::AnalyzeOptions;
use crate::discovery::{FileEnumerator, GlobWalker};
use crate::error::{AnalyzeError, Result};
use crate::report_io::write_report;
use crate::resolution::ResolutionContext;
use crate::scanner::{ScanStats, Scanner};

/// Outcome of one run.
#[derive(Debug)]
pub struct Analysis {
    pub report: AnalysisReport,
    pub scan_stats: ScanStats,
    /// Where the report was written, when `outFile` was set. A write failure
    /// leaves `report` valid.
    pub report_file: Option<Result<PathBuf>>,
}

/// Runs the full pipeline: resolution context, scan, graph passes, report.
pub struct Analyzer {
    options: AnalyzeOptions,
    enumerator: Option<Box<dyn FileEnumerator>>,
}

impl Analyzer {
    pub fn new(options: AnalyzeOptions) -> Self {
        Self {
            options,
            enumerator: None,
        }
    }

    /// Replace the glob-based file walk.
    pub fn with_enumerator(mut self, enumerator: impl FileEnumerator + 'static) -> Self {
        self.enumerator = Some(Box::new(enumerator));
        self
    }

    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Analyze the project at `root`.
    ///
    /// # Errors
    ///
    /// Fails only when the options are invalid or the root is missing or not a
    /// directory. Per-file problems become report warnings.
    pub fn analyze(&self, root: impl AsRef<Path>) -> Result<Analysis> {
        self.options.validate()?;
        let root = canonical_root(root.as_ref())?;

        let walker;
        let enumerator: &dyn FileEnumerator = match &self.enumerator {
            Some(enumerator) => enumerator.as_ref(),
            None => {
                walker = GlobWalker::from_options(&self.options)?;
                &walker
            }
        };

        let span = tracing::info_span!("analyze", root = %root.display());
        let _guard = span.enter();

        match self.thread_pool() {
            Some(pool) => pool.install(|| self.run(&root, enumerator)),
            None => self.run(&root, enumerator),
        }
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        let jobs = self.options.jobs?;
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => Some(pool),
            Err(error) => {
                tracing::warn!(%error, jobs, "Falling back to the global thread pool");
                None
            }
        }
    }

    fn run(&self, root: &Path, enumerator: &dyn FileEnumerator) -> Result<Analysis> {
        let started = Instant::now();

        let context = ResolutionContext::discover(root);
        let files = enumerator.enumerate(root)?;

        let cache_file = self.options.cache_file(root);
        let previous = self.options.use_cache.then(|| ScanCache::load(&cache_file));

        let scan = Scanner::new(root, &context)
            .with_resolve_aliases(self.options.resolve_aliases)
            .scan(&files, previous.as_ref());

        if self.options.use_cache {
            if let Err(error) = scan.cache.save(&cache_file) {
                tracing::warn!(%error, "Failed to write scan cache");
            }
        }

        let mut nodes = scan.nodes;
        let edges = deduplicate_edges(scan.edges);
        apply_degrees(&mut nodes, &edges);

        let graph_started = Instant::now();
        let adjacency = Adjacency::from_edges(nodes.len(), &edges);
        let cycles = find_cycles(&nodes, &adjacency);
        let mesh = find_mesh_nodes(&nodes, self.options.mesh_percentile);
        for item in &mesh {
            if let Some(node) = nodes.get_mut(item.node_id as usize) {
                node.mesh_score = item.score;
            }
        }
        let closure_size_by_node = compute_closure_sizes(&nodes, &adjacency);
        let aggregates = build_aggregates(&nodes, &adjacency, self.options.aggregate_depth);
        tracing::debug!(
            elapsed_ms = graph_started.elapsed().as_millis() as u64,
            "Graph passes completed"
        );

        let report = AnalysisReport {
            meta: ReportMeta {
                root: to_posix(root),
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                duration_ms: started.elapsed().as_millis() as u64,
                file_count: nodes.len(),
                edge_count: edges.len(),
                version: REPORT_VERSION.to_string(),
            },
            nodes,
            edges,
            cycles,
            mesh,
            aggregates,
            closure_size_by_node,
            warnings: scan.warnings,
        };

        tracing::info!(
            files = report.meta.file_count,
            edges = report.meta.edge_count,
            cycles = report.cycles.len(),
            mesh = report.mesh.len(),
            warnings = report.warnings.len(),
            duration_ms = report.meta.duration_ms,
            "Analysis completed"
        );

        let report_file = self.options.out_file_path(root).map(|path| {
            write_report(&path, &report).map(|()| path).inspect_err(|error| {
                tracing::warn!(%error, "Report not written");
            })
        });

        Ok(Analysis {
            report,
            scan_stats: scan.stats,
            report_file,
        })
    }
}

/// Analyze `root` with `options`.
pub fn analyze(root: impl AsRef<Path>, options: &AnalyzeOptions) -> Result<Analysis> {
    Analyzer::new(options.clone()).analyze(root)
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(root).map_err(|source| AnalyzeError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(AnalyzeError::RootNotDirectory(root.to_path_buf()));
    }
    fs::canonicalize(root).map_err(|source| AnalyzeError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })
}
