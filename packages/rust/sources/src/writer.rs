//! JSON output for merged records and run reports.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use leadmerge_shared::{LeadMergeError, Record, Result, RunReport};

/// Write merged records as a pretty-printed JSON array.
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    write_json(path, records)?;
    info!(path = %path.display(), records = records.len(), "merged records written");
    Ok(())
}

/// Write the run report.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    write_json(path, report)?;
    info!(path = %path.display(), run_id = %report.run_id, "run report written");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LeadMergeError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LeadMergeError::parse(format!("cannot serialize {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(|e| LeadMergeError::io(path, e))
}
