//! # okdep-analysis
//!
//! Incremental dependency-graph analysis for JavaScript and TypeScript
//! projects.
//!
//! One [`analyze`] call walks a project, extracts every import, export,
//! dynamic `import()` and `require()` reference with the oxc parser, resolves
//! internal references to files (cheap candidate guessing first, then a
//! tsconfig-aware resolver), and hands the deduplicated graph to
//! [`okdep_graph::algorithms`] for cycles, hotspots, closure sizes and
//! directory aggregates.
//!
//! Parsed reference lists are cached per file under `<root>/.okdep/cache`,
//! keyed by modification time and size, so unchanged files are not re-parsed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use okdep_analysis::{AnalyzeOptions, analyze};
//!
//! # fn main() -> okdep_analysis::Result<()> {
//! let options = AnalyzeOptions::load("./my-app")?.with_out_file("report.json");
//! let analysis = analyze("./my-app", &options)?;
//!
//! println!("{}", analysis.report.summary());
//! for cycle in &analysis.report.cycles {
//!     println!("cycle: {}", analysis.report.cycle_paths(cycle).join(" -> "));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events. Enable the `logging` feature for a
//! ready-made subscriber in [`logging`].

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod report_io;
pub mod resolution;
pub mod scanner;
pub mod tsconfig;

#[cfg(feature = "logging")]
pub mod logging;

pub use analyzer::{Analysis, Analyzer, analyze};
pub use config::AnalyzeOptions;
pub use discovery::{FileEnumerator, GlobWalker};
pub use error::{AnalyzeError, Result};
pub use report_io::{load_report, write_report};
pub use resolution::ResolutionContext;
pub use scanner::ScanStats;

pub use okdep_graph::{
    AnalysisReport, AnalysisWarning, CycleGroup, DependencyEdge, EdgeKind, FileNode, MeshNode,
    WarningKind,
};
