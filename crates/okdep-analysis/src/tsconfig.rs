//! `tsconfig.json` discovery and the subset of compiler options that affects
//! module resolution.
//!
//! Files are read as JSON with comments and trailing commas. `extends`
//! chains are followed with child options overriding the parent; package
//! references such as `@tsconfig/node20/tsconfig.json` are looked up in
//! `node_modules` with the module resolver.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use oxc_resolver::{ResolveOptions, Resolver};
use path_clean::PathClean;
use serde::Deserialize;
use thiserror::Error;

pub const TSCONFIG_FILE_NAME: &str = "tsconfig.json";

/// Maximum length of an `extends` chain.
pub const MAX_EXTENDS_DEPTH: usize = 8;

#[derive(Debug, Error)]
pub enum TsConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("extends chain starting at {} exceeds the maximum depth", path.display())]
    ExtendsTooDeep { path: PathBuf },
}

/// One `paths` entry with its targets and the directory they are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub pattern: String,
    pub targets: Vec<String>,
    pub base: PathBuf,
}

impl PathMapping {
    /// Text captured by the pattern's `*`, or the empty string for an exact
    /// match. `None` when the specifier does not match.
    fn capture<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        match self.pattern.split_once('*') {
            Some((prefix, suffix)) => {
                if specifier.len() >= prefix.len() + suffix.len()
                    && specifier.starts_with(prefix)
                    && specifier.ends_with(suffix)
                {
                    Some(&specifier[prefix.len()..specifier.len() - suffix.len()])
                } else {
                    None
                }
            }
            None => (self.pattern == specifier).then_some(""),
        }
    }

    fn prefix_len(&self) -> usize {
        self.pattern.split_once('*').map_or(self.pattern.len(), |(prefix, _)| prefix.len())
    }
}

/// Resolution-relevant compiler options, with all paths made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub base_url: Option<PathBuf>,
    pub paths: Vec<PathMapping>,
    pub allow_js: bool,
    pub module_resolution: String,
}

impl Default for CompilerOptions {
    /// Permissive settings used when no tsconfig is found.
    fn default() -> Self {
        Self {
            base_url: None,
            paths: Vec::new(),
            allow_js: true,
            module_resolution: "bundler".to_string(),
        }
    }
}

impl CompilerOptions {
    /// Absolute candidate paths for a bare specifier, following TypeScript's
    /// rule that the mapping with the longest matching prefix wins.
    pub fn path_candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let best = self
            .paths
            .iter()
            .filter_map(|mapping| mapping.capture(specifier).map(|captured| (mapping, captured)))
            .max_by_key(|(mapping, _)| mapping.prefix_len());

        let Some((mapping, captured)) = best else {
            return Vec::new();
        };

        mapping
            .targets
            .iter()
            .map(|target| mapping.base.join(target.replacen('*', captured, 1)).clean())
            .collect()
    }

    pub fn matches_path_mapping(&self, specifier: &str) -> bool {
        self.paths.iter().any(|mapping| mapping.capture(specifier).is_some())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    extends: Option<Extends>,
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: Option<IndexMap<String, Vec<String>>>,
    allow_js: Option<bool>,
    module_resolution: Option<String>,
}

/// Options accumulated along an extends chain, before defaults are applied.
#[derive(Debug, Default)]
struct Layered {
    base_url: Option<PathBuf>,
    /// Mappings plus the directory of the config that declared them.
    paths: Option<(IndexMap<String, Vec<String>>, PathBuf)>,
    allow_js: Option<bool>,
    module_resolution: Option<String>,
}

impl Layered {
    /// Apply `raw` (declared in `dir`) on top of `self`.
    fn overlay(&mut self, raw: RawCompilerOptions, dir: &Path) {
        if let Some(base_url) = raw.base_url {
            self.base_url = Some(dir.join(base_url).clean());
        }
        if let Some(paths) = raw.paths {
            self.paths = Some((paths, dir.to_path_buf()));
        }
        if raw.allow_js.is_some() {
            self.allow_js = raw.allow_js;
        }
        if raw.module_resolution.is_some() {
            self.module_resolution = raw.module_resolution;
        }
    }

    fn finish(self) -> CompilerOptions {
        let defaults = CompilerOptions::default();
        // `paths` targets are relative to baseUrl when set, else to the declaring config.
        let paths = match self.paths {
            Some((paths, declared_in)) => {
                let base = self.base_url.clone().unwrap_or(declared_in);
                paths
                    .into_iter()
                    .map(|(pattern, targets)| PathMapping {
                        pattern,
                        targets,
                        base: base.clone(),
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        CompilerOptions {
            base_url: self.base_url,
            paths,
            allow_js: self.allow_js.unwrap_or(defaults.allow_js),
            module_resolution: self
                .module_resolution
                .map(|value| value.to_ascii_lowercase())
                .unwrap_or(defaults.module_resolution),
        }
    }
}

/// Nearest `tsconfig.json` at or above `start`.
pub fn find_tsconfig(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(TSCONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Load compiler options from `path`, following `extends`.
pub fn load_tsconfig(path: &Path) -> Result<CompilerOptions, TsConfigError> {
    let resolver = extends_resolver();
    let mut layered = Layered::default();
    apply_config(path, &resolver, &mut layered, 0)?;
    Ok(layered.finish())
}

/// Resolver for package `extends` targets: `pkg` means `pkg/tsconfig.json`
/// unless its package.json names one, and `.json` may be omitted.
fn extends_resolver() -> Resolver {
    Resolver::new(ResolveOptions {
        extensions: vec![".json".into()],
        main_fields: vec!["tsconfig".into()],
        main_files: vec!["tsconfig".into()],
        symlinks: false,
        ..Default::default()
    })
}

fn apply_config(
    path: &Path,
    resolver: &Resolver,
    layered: &mut Layered,
    depth: usize,
) -> Result<(), TsConfigError> {
    if depth > MAX_EXTENDS_DEPTH {
        return Err(TsConfigError::ExtendsTooDeep {
            path: path.to_path_buf(),
        });
    }

    let text = fs::read_to_string(path).map_err(|source| TsConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawTsConfig =
        serde_json::from_str(&strip_jsonc(&text)).map_err(|source| TsConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();

    let parents = match raw.extends {
        Some(Extends::One(parent)) => vec![parent],
        Some(Extends::Many(parents)) => parents,
        None => Vec::new(),
    };
    for parent in parents {
        match extends_path(&dir, &parent, resolver) {
            Some(parent_path) => apply_config(&parent_path, resolver, layered, depth + 1)?,
            None => tracing::warn!(
                config = %path.display(),
                extends = %parent,
                "Skipping unresolvable tsconfig extends"
            ),
        }
    }

    if let Some(compiler_options) = raw.compiler_options {
        layered.overlay(compiler_options, &dir);
    }
    Ok(())
}

/// Locate an `extends` target. Relative and absolute references may omit
/// `.json`; anything else is a package lookup from `dir`.
fn extends_path(dir: &Path, reference: &str, resolver: &Resolver) -> Option<PathBuf> {
    if !(reference.starts_with('.') || Path::new(reference).is_absolute()) {
        return match resolver.resolve(dir, reference) {
            Ok(resolution) => Some(resolution.into_path_buf()),
            Err(error) => {
                tracing::debug!(extends = reference, %error, "tsconfig extends lookup failed");
                None
            }
        };
    }
    let direct = dir.join(reference).clean();
    if direct.is_file() {
        return Some(direct);
    }
    let with_json = dir.join(format!("{reference}.json")).clean();
    if with_json.is_file() {
        Some(with_json)
    } else {
        Some(direct)
    }
}

/// Remove `//` and `/* */` comments plus trailing commas, leaving string
/// literals untouched.
pub fn strip_jsonc(input: &str) -> String {
    let without_comments = strip_comments(input);
    strip_trailing_commas(&without_comments)
}

fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(index + 1) {
                    out.push(escaped);
                    index += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[index + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        index += 1;
    }
    out
}
