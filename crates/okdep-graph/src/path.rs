//! Path helpers shared by the scanner and the aggregation pass.
//!
//! Every path that leaves this module uses `/` separators so report output is
//! identical across platforms.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use path_clean::PathClean;

/// Extensions (lowercase, leading dot) that the analyzer treats as source modules.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".mts", ".cts"];

/// Aggregation key used for the project root and for empty paths.
pub const ROOT_KEY: &str = ".";

/// Render a path with `/` separators.
pub fn to_posix(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if MAIN_SEPARATOR == '/' {
        raw.into_owned()
    } else {
        raw.replace(MAIN_SEPARATOR, "/")
    }
}

/// Resolve `input` against `base` when it is relative, then lexically clean it.
///
/// No filesystem access happens here; `..` and `.` components are folded
/// purely on the path text.
pub fn normalize_absolute(input: &Path, base: &Path) -> PathBuf {
    if input.is_absolute() {
        input.clean()
    } else {
        base.join(input).clean()
    }
}

/// Path of `abs` relative to `root`, `/`-separated.
///
/// Returns [`ROOT_KEY`] for the root itself. Paths outside `root` are
/// returned as their full normalized form.
pub fn relative_path(root: &Path, abs: &Path) -> String {
    match abs.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ROOT_KEY.to_string(),
        Ok(rel) => to_posix(rel),
        Err(_) => to_posix(abs),
    }
}

/// Lowercase extension including the leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Whether the file has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_analyzable(path: &Path) -> bool {
    let ext = extension_of(path);
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Directory-aggregation key: the first `depth` segments of a relative path.
///
/// Paths with `depth` or fewer segments are their own key.
pub fn aggregate_key(relative: &str, depth: usize) -> String {
    let cleaned = relative.strip_prefix("./").unwrap_or(relative);
    let parts: Vec<&str> = cleaned
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    if parts.is_empty() {
        return ROOT_KEY.to_string();
    }

    parts[..parts.len().min(depth.max(1))].join("/")
}

/// Map declaration files (`x.d.ts`, `x.d.mts`, `x.d.cts`) onto their sources.
pub fn strip_declaration_suffix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    for (declaration, source) in [(".d.ts", ".ts"), (".d.mts", ".mts"), (".d.cts", ".cts")] {
        if let Some(stem) = raw.strip_suffix(declaration) {
            return PathBuf::from(format!("{stem}{source}"));
        }
    }
    path.to_path_buf()
}
