//! Error types for dependency analysis.
//!
//! Only conditions that make a whole run meaningless are errors. Anything
//! specific to one file degrades to an [`AnalysisWarning`] on the report.
//!
//! [`AnalysisWarning`]: okdep_graph::AnalysisWarning

use std::path::PathBuf;

use thiserror::Error;

/// Fatal analysis errors.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The scan root does not exist or cannot be accessed.
    #[error("Root not found: {}: {source}", path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan root exists but is not a directory.
    #[error("Root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    /// An include or ignore glob failed to compile.
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// An option value is outside its allowed range.
    #[error("Invalid option {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    /// Layered configuration could not be extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The directory walk failed before producing any entries.
    #[error("Failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: ignore::Error,
    },

    /// The report could not be written to the requested output file.
    #[error("Failed to write report to {}: {reason}", path.display())]
    WriteReport { path: PathBuf, reason: String },

    /// A persisted report could not be read back.
    #[error("Failed to read report from {}: {reason}", path.display())]
    ReadReport { path: PathBuf, reason: String },
}

impl From<figment::Error> for AnalyzeError {
    fn from(error: figment::Error) -> Self {
        AnalyzeError::Config(Box::new(error))
    }
}

/// Result alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalyzeError>;
