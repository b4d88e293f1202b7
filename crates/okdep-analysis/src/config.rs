//! Analysis options and their layered loading.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, Result};

/// Optional per-project configuration file, looked up in the scan root.
pub const CONFIG_FILE_NAME: &str = "okdep.config.json";

/// Prefix of environment variables that override configuration.
pub const ENV_PREFIX: &str = "OKDEP_";

/// Cache directory used when `cacheDir` is not set, relative to the root.
pub const DEFAULT_CACHE_DIR: &str = ".okdep/cache";

/// File name of the scan cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "scan-cache.json";

pub const DEFAULT_AGGREGATE_DEPTH: usize = 2;

pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["**/*.{ts,tsx,js,jsx,mjs,cjs,mts,cts}"];

pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/.next/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
];

/// Field names as they appear in the config file, used to map
/// `OKDEP_MESH_PERCENTILE` style variables onto camelCase keys.
const FIELD_NAMES: &[&str] = &[
    "includePatterns",
    "ignorePatterns",
    "cacheDir",
    "aggregateDepth",
    "meshPercentile",
    "outFile",
    "jobs",
    "useCache",
    "resolveAliases",
];

/// Options for one analysis run.
///
/// Relative `cacheDir` and `outFile` paths are resolved against the scan root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeOptions {
    /// Globs (relative to the root) selecting candidate files.
    pub include_patterns: Vec<String>,

    /// Globs excluding files and whole directories.
    pub ignore_patterns: Vec<String>,

    /// Where `scan-cache.json` lives. Defaults to `<root>/.okdep/cache`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Number of leading path segments forming a directory aggregate.
    pub aggregate_depth: usize,

    /// Percentile (0-100) both degrees must reach for a hotspot.
    pub mesh_percentile: f64,

    /// Persist the report here as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_file: Option<PathBuf>,

    /// Worker threads for parsing and graph passes. Defaults to the CPU count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Read and write the scan cache.
    pub use_cache: bool,

    /// Treat bare specifiers matching tsconfig `paths` as internal.
    pub resolve_aliases: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            include_patterns: DEFAULT_INCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            cache_dir: None,
            aggregate_depth: DEFAULT_AGGREGATE_DEPTH,
            mesh_percentile: okdep_graph::algorithms::DEFAULT_MESH_PERCENTILE,
            out_file: None,
            jobs: None,
            use_cache: true,
            resolve_aliases: true,
        }
    }
}

impl AnalyzeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options for `root`.
    ///
    /// Priority: environment variables > `<root>/okdep.config.json` > defaults.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = root.as_ref().join(CONFIG_FILE_NAME);
        if config_file.is_file() {
            figment = figment.merge(Json::file(config_file));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .lowercase(false)
                .map(|key| env_field_name(key.as_str()).into()),
        );

        let options: Self = figment.extract()?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_include_patterns(
        mut self,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.include_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignore_patterns(
        mut self,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ignore_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_aggregate_depth(mut self, depth: usize) -> Self {
        self.aggregate_depth = depth;
        self
    }

    pub fn with_mesh_percentile(mut self, percentile: f64) -> Self {
        self.mesh_percentile = percentile;
        self
    }

    pub fn with_out_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_file = Some(path.into());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn with_resolve_aliases(mut self, enabled: bool) -> Self {
        self.resolve_aliases = enabled;
        self
    }

    /// Reject values no run could honour.
    pub fn validate(&self) -> Result<()> {
        if self.aggregate_depth < 1 {
            return Err(AnalyzeError::InvalidOption {
                field: "aggregateDepth",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.mesh_percentile.is_finite() || !(0.0..=100.0).contains(&self.mesh_percentile) {
            return Err(AnalyzeError::InvalidOption {
                field: "meshPercentile",
                reason: format!("{} is not within 0..=100", self.mesh_percentile),
            });
        }
        if self.jobs == Some(0) {
            return Err(AnalyzeError::InvalidOption {
                field: "jobs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Absolute location of the scan cache file for `root`.
    pub fn cache_file(&self, root: &Path) -> PathBuf {
        let dir = match &self.cache_dir {
            Some(dir) => root.join(dir),
            None => root.join(DEFAULT_CACHE_DIR),
        };
        dir.join(CACHE_FILE_NAME)
    }

    /// Absolute location of the report output file, if one was requested.
    pub fn out_file_path(&self, root: &Path) -> Option<PathBuf> {
        self.out_file.as_ref().map(|path| root.join(path))
    }
}

/// `MESH_PERCENTILE` / `meshpercentile` -> `meshPercentile`.
fn env_field_name(key: &str) -> String {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    FIELD_NAMES
        .iter()
        .find(|name| name.to_ascii_lowercase() == folded)
        .map(|name| name.to_string())
        .unwrap_or(folded)
}
