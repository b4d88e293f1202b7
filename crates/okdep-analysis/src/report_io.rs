//! Reading and writing persisted reports.

use std::fs;
use std::path::Path;

use okdep_graph::AnalysisReport;

use crate::error::{AnalyzeError, Result};

/// Write `report` as pretty-printed JSON, creating parent directories.
pub fn write_report(path: &Path, report: &AnalysisReport) -> Result<()> {
    let failed = |reason: String| AnalyzeError::WriteReport {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(report).map_err(|e| failed(e.to_string()))?;
    fs::write(path, json).map_err(|e| failed(e.to_string()))
}

/// Read a report previously written by [`write_report`].
pub fn load_report(path: &Path) -> Result<AnalysisReport> {
    let failed = |reason: String| AnalyzeError::ReadReport {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| failed(e.to_string()))
}
