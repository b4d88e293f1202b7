//! Compiler-grade module resolution.
//!
//! A [`ResolutionContext`] is built once per run from the nearest tsconfig and
//! answers `(specifier, containing file) -> file` queries. It is the second
//! resolution pass; the scanner tries cheap candidate guessing first.

use std::path::{Path, PathBuf};

use okdep_graph::path::{normalize_absolute, strip_declaration_suffix};
use oxc_resolver::{ResolveOptions, Resolver};

use crate::tsconfig::{CompilerOptions, find_tsconfig, load_tsconfig};

const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts", ".d.ts"];
const JS_EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs"];

/// Module resolution state shared read-only by all scan workers.
pub struct ResolutionContext {
    config_path: Option<PathBuf>,
    options: CompilerOptions,
    resolver: Resolver,
}

impl std::fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("config_path", &self.config_path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ResolutionContext {
    /// Locate the nearest tsconfig at or above `root` and build a context
    /// from it. A missing or unreadable tsconfig yields permissive defaults.
    pub fn discover(root: &Path) -> Self {
        let Some(config_path) = find_tsconfig(root) else {
            tracing::debug!(root = %root.display(), "No tsconfig found, using defaults");
            return Self::new(CompilerOptions::default(), None);
        };

        match load_tsconfig(&config_path) {
            Ok(options) => {
                tracing::debug!(
                    config = %config_path.display(),
                    paths = options.paths.len(),
                    module_resolution = %options.module_resolution,
                    "Loaded tsconfig"
                );
                Self::new(options, Some(config_path))
            }
            Err(error) => {
                tracing::warn!(%error, "Ignoring unusable tsconfig");
                Self::new(CompilerOptions::default(), Some(config_path))
            }
        }
    }

    pub fn new(options: CompilerOptions, config_path: Option<PathBuf>) -> Self {
        let resolver = Resolver::new(resolve_options(&options));
        Self {
            config_path,
            options,
            resolver,
        }
    }

    /// The tsconfig this context was built from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Whether a bare specifier is covered by a `paths` mapping.
    pub fn matches_alias(&self, specifier: &str) -> bool {
        self.options.matches_path_mapping(specifier)
    }

    /// Resolve `specifier` as imported from `containing_file`.
    ///
    /// Declaration files map back to their sources. Returns `None` when
    /// nothing on disk matches.
    pub fn resolve(&self, specifier: &str, containing_file: &Path) -> Option<PathBuf> {
        let dir = containing_file.parent().unwrap_or(containing_file);

        let resolved = if is_relative_or_absolute(specifier) {
            self.resolve_in(dir, specifier)
        } else {
            self.options
                .path_candidates(specifier)
                .into_iter()
                .chain(self.options.base_url.as_ref().map(|base| base.join(specifier)))
                .find_map(|candidate| self.resolve_in(dir, &candidate.to_string_lossy()))
                .or_else(|| self.resolve_in(dir, specifier))
        }?;

        Some(normalize_absolute(&strip_declaration_suffix(&resolved), dir))
    }

    fn resolve_in(&self, dir: &Path, specifier: &str) -> Option<PathBuf> {
        match self.resolver.resolve(dir, specifier) {
            Ok(resolution) => Some(resolution.path().to_path_buf()),
            Err(error) => {
                tracing::trace!(specifier, dir = %dir.display(), %error, "Resolver miss");
                None
            }
        }
    }
}

/// Relative (`./`, `../`, `.`) or absolute specifiers. Everything else is bare.
pub fn is_relative_or_absolute(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/') || Path::new(specifier).is_absolute()
}

fn resolve_options(options: &CompilerOptions) -> ResolveOptions {
    let mut extensions: Vec<String> = TS_EXTENSIONS.iter().map(|ext| ext.to_string()).collect();
    if options.allow_js {
        extensions.extend(JS_EXTENSIONS.iter().map(|ext| ext.to_string()));
    }

    let mut condition_names = vec!["types".to_string(), "import".to_string()];
    if matches!(options.module_resolution.as_str(), "node16" | "nodenext") {
        condition_names.push("node".to_string());
    } else {
        condition_names.push("module".to_string());
    }
    condition_names.extend(["require".to_string(), "default".to_string()]);

    ResolveOptions {
        condition_names,
        extensions,
        // TypeScript lets `./x.js` name `./x.ts`.
        extension_alias: vec![
            (
                ".js".into(),
                vec![".ts".into(), ".tsx".into(), ".d.ts".into(), ".js".into()],
            ),
            (".jsx".into(), vec![".tsx".into(), ".jsx".into()]),
            (".mjs".into(), vec![".mts".into(), ".d.mts".into(), ".mjs".into()]),
            (".cjs".into(), vec![".cts".into(), ".d.cts".into(), ".cjs".into()]),
        ],
        main_fields: vec!["types".into(), "module".into(), "main".into()],
        main_files: vec!["index".into()],
        symlinks: false,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsconfig::PathMapping;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        temp
    }

    #[test]
    fn resolves_relative_with_extension_inference() {
        let temp = project(&[("src/a.ts", ""), ("src/b.tsx", ""), ("src/lib/index.ts", "")]);
        let root = temp.path();
        let context = ResolutionContext::new(CompilerOptions::default(), None);
        let from = root.join("src/a.ts");

        assert_eq!(context.resolve("./b", &from), Some(root.join("src/b.tsx")));
        assert_eq!(context.resolve("./lib", &from), Some(root.join("src/lib/index.ts")));
        assert_eq!(context.resolve("./missing", &from), None);
    }

    #[test]
    fn js_specifier_maps_to_ts_source() {
        let temp = project(&[("src/a.ts", ""), ("src/util.ts", "")]);
        let root = temp.path();
        let context = ResolutionContext::new(CompilerOptions::default(), None);

        assert_eq!(
            context.resolve("./util.js", &root.join("src/a.ts")),
            Some(root.join("src/util.ts"))
        );
    }

    #[test]
    fn declaration_results_map_to_sources() {
        let temp = project(&[("src/a.ts", ""), ("src/types.d.ts", "")]);
        let root = temp.path();
        let context = ResolutionContext::new(CompilerOptions::default(), None);

        assert_eq!(
            context.resolve("./types", &root.join("src/a.ts")),
            Some(root.join("src/types.ts"))
        );
    }

    #[test]
    fn resolves_path_aliases() {
        let temp = project(&[("src/app.ts", ""), ("src/components/button.tsx", "")]);
        let root = temp.path();
        let options = CompilerOptions {
            paths: vec![PathMapping {
                pattern: "@/*".into(),
                targets: vec!["src/*".into()],
                base: root.to_path_buf(),
            }],
            ..CompilerOptions::default()
        };
        let context = ResolutionContext::new(options, None);

        assert!(context.matches_alias("@/components/button"));
        assert!(!context.matches_alias("react"));
        assert_eq!(
            context.resolve("@/components/button", &root.join("src/app.ts")),
            Some(root.join("src/components/button.tsx"))
        );
    }

    #[test]
    fn discover_reads_tsconfig_paths() {
        let temp = project(&[
            (
                "tsconfig.json",
                r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "~/*": ["lib/*"] } } }"#,
            ),
            ("lib/math.ts", ""),
            ("src/main.ts", ""),
        ]);
        let root = temp.path();
        let context = ResolutionContext::discover(root);

        assert_eq!(context.config_path(), Some(root.join("tsconfig.json").as_path()));
        assert_eq!(
            context.resolve("~/math", &root.join("src/main.ts")),
            Some(root.join("lib/math.ts"))
        );
        // baseUrl makes `lib/math` resolvable as a bare specifier.
        assert_eq!(
            context.resolve("lib/math", &root.join("src/main.ts")),
            Some(root.join("lib/math.ts"))
        );
    }

    #[test]
    fn broken_tsconfig_falls_back_to_defaults() {
        let temp = project(&[("tsconfig.json", "{ broken"), ("a.js", ""), ("b.js", "")]);
        let context = ResolutionContext::discover(temp.path());

        assert!(context.compiler_options().allow_js);
        assert_eq!(
            context.resolve("./b", &temp.path().join("a.js")),
            Some(temp.path().join("b.js"))
        );
    }

    #[test]
    fn classifies_specifiers() {
        assert!(is_relative_or_absolute("./a"));
        assert!(is_relative_or_absolute("../a"));
        assert!(is_relative_or_absolute("/abs/a"));
        assert!(!is_relative_or_absolute("react"));
        assert!(!is_relative_or_absolute("@scope/pkg"));
    }
}
