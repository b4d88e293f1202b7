//! Candidate file enumeration.
//!
//! The scanner only sees a sorted list of absolute paths; how they are found
//! sits behind [`FileEnumerator`].

use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use okdep_graph::path::{is_analyzable, to_posix};
use path_clean::PathClean;

use crate::config::AnalyzeOptions;
use crate::error::{AnalyzeError, Result};

/// Produces the candidate files for a scan.
///
/// Implementations must return absolute paths in a stable order; node ids are
/// assigned from it.
pub trait FileEnumerator: Send + Sync {
    fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Filesystem walk filtered by include and ignore globs.
///
/// Globs are matched against root-relative `/` paths and `*` does not cross
/// directory boundaries. Hidden files and directories are skipped, and
/// directories matched by an ignore glob are not descended into.
#[derive(Debug, Clone)]
pub struct GlobWalker {
    include: GlobSet,
    ignore: GlobSet,
}

impl GlobWalker {
    pub fn new(include: &[String], ignore: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_globset(include)?,
            ignore: compile_globset(ignore)?,
        })
    }

    pub fn from_options(options: &AnalyzeOptions) -> Result<Self> {
        Self::new(&options.include_patterns, &options.ignore_patterns)
    }

    fn is_ignored_dir(ignore: &GlobSet, relative: &str) -> bool {
        // `**/dist/**` matches paths under `dist`, not `dist` itself.
        ignore.is_match(relative) || ignore.is_match(format!("{relative}/_"))
    }
}

impl FileEnumerator for GlobWalker {
    fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(root).map_err(|source| AnalyzeError::Walk {
            root: root.to_path_buf(),
            source: source.into(),
        })?;

        let prune_root = root.to_path_buf();
        let prune_set = self.ignore.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                match entry.path().strip_prefix(&prune_root) {
                    Ok(relative) => !GlobWalker::is_ignored_dir(&prune_set, &to_posix(relative)),
                    Err(_) => true,
                }
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(%error, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let relative = to_posix(relative);
            if self.include.is_match(&relative)
                && !self.ignore.is_match(&relative)
                && is_analyzable(path)
            {
                files.push(path.to_path_buf().clean());
            }
        }

        files.sort();
        files.dedup();
        tracing::debug!(root = %root.display(), files = files.len(), "File discovery completed");
        Ok(files)
    }
}

fn compile_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            continue;
        }
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| AnalyzeError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| AnalyzeError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
    }

    fn relative(root: &Path, files: Vec<PathBuf>) -> Vec<String> {
        files
            .iter()
            .map(|path| to_posix(path.strip_prefix(root).unwrap()))
            .collect()
    }

    #[test]
    fn default_patterns_skip_vendor_and_build_output() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(
            root,
            &[
                "src/b.ts",
                "src/a.tsx",
                "src/c.mjs",
                "src/styles.css",
                "node_modules/pkg/index.js",
                "packages/x/node_modules/y/index.js",
                "dist/out.js",
                "coverage/lcov.js",
                ".hidden/secret.ts",
                "src/.eslintrc.js",
                "lib/server.cts",
            ],
        );

        let walker = GlobWalker::from_options(&AnalyzeOptions::default()).unwrap();
        let files = walker.enumerate(root).unwrap();

        assert_eq!(
            relative(root, files),
            vec!["lib/server.cts", "src/a.tsx", "src/b.ts", "src/c.mjs"]
        );
    }

    #[test]
    fn include_patterns_narrow_the_set() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, &["src/a.ts", "scripts/build.ts", "index.ts"]);

        let walker = GlobWalker::new(&["src/**/*.ts".to_string()], &[]).unwrap();

        assert_eq!(relative(root, walker.enumerate(root).unwrap()), vec!["src/a.ts"]);
    }

    #[test]
    fn star_does_not_cross_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, &["a.ts", "nested/b.ts"]);

        let walker = GlobWalker::new(&["*.ts".to_string()], &[]).unwrap();

        assert_eq!(relative(root, walker.enumerate(root).unwrap()), vec!["a.ts"]);
    }

    #[test]
    fn file_level_ignores_apply() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, &["src/a.ts", "src/a.test.ts"]);

        let walker = GlobWalker::new(
            &["**/*.ts".to_string()],
            &["**/*.test.ts".to_string()],
        )
        .unwrap();

        assert_eq!(relative(root, walker.enumerate(root).unwrap()), vec!["src/a.ts"]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let result = GlobWalker::new(&["src/[".to_string()], &[]);
        assert!(matches!(
            result,
            Err(AnalyzeError::InvalidPattern { ref pattern, .. }) if pattern == "src/["
        ));
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let temp = TempDir::new().unwrap();
        let walker = GlobWalker::from_options(&AnalyzeOptions::default()).unwrap();
        let result = walker.enumerate(&temp.path().join("absent"));
        assert!(matches!(result, Err(AnalyzeError::Walk { .. })));
    }
}
