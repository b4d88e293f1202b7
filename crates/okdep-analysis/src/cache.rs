//! Persistent scan cache.
//!
//! Maps absolute file paths to the reference list parsed from them, keyed by
//! modification time and size. The cache is advisory: anything unreadable or
//! from another format version is discarded as a whole.

use std::collections::BTreeMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ParsedImport;

/// Cache format version. Bump when `CacheEntry` changes shape.
pub const CACHE_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read cache {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported cache version {found}")]
    VersionMismatch { found: String },

    #[error("Failed to write cache {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// File identity used to decide whether a cached entry is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    /// Modification time in nanoseconds since the Unix epoch, when the
    /// platform reports one.
    pub mtime: Option<u64>,
    pub size: u64,
}

impl FileStamp {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .and_then(|duration| u64::try_from(duration.as_nanos()).ok());
        Self {
            mtime,
            size: metadata.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub mtime: u64,
    pub size: u64,
    pub imports: Vec<ParsedImport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCache {
    pub version: String,
    pub files: BTreeMap<String, CacheEntry>,
}

impl Default for ScanCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            files: BTreeMap::new(),
        }
    }
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache at `path`, falling back to an empty cache on any failure.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(cache) => {
                tracing::debug!(path = %path.display(), entries = cache.len(), "Loaded scan cache");
                cache
            }
            Err(CacheError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(error) => {
                tracing::debug!(%error, "Discarding scan cache");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, CacheError> {
        let text = fs::read_to_string(path).map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cache: ScanCache = serde_json::from_str(&text).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        if cache.version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch {
                found: cache.version,
            });
        }
        Ok(cache)
    }

    /// Cached references for `key`, if its stamp still matches.
    pub fn lookup(&self, key: &str, stamp: FileStamp) -> Option<&[ParsedImport]> {
        let mtime = stamp.mtime?;
        self.files
            .get(key)
            .filter(|entry| entry.mtime == mtime && entry.size == stamp.size)
            .map(|entry| entry.imports.as_slice())
    }

    /// Record references for `key`. Files without a modification time are not
    /// cacheable and are skipped.
    pub fn insert(&mut self, key: impl Into<String>, stamp: FileStamp, imports: Vec<ParsedImport>) {
        if let Some(mtime) = stamp.mtime {
            self.files.insert(
                key.into(),
                CacheEntry {
                    mtime,
                    size: stamp.size,
                    imports,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Overwrite the cache file, creating its directory.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_vec(self).map_err(CacheError::Serialize)?;
        fs::write(path, json).map_err(|source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
