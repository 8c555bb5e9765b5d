//! Reference (exclusion list) loading.
//!
//! Reference lists usually come from a spreadsheet export: a CSV with a
//! header row. A JSON array of objects is accepted too; its values are
//! stringified so both shapes yield the same string rows.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use leadmerge_shared::{LeadMergeError, ReferenceRow, Result};

/// Load reference rows from `.csv` (by extension) or JSON.
pub fn load_reference_rows(path: &Path) -> Result<Vec<ReferenceRow>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let rows = if is_csv {
        let file = std::fs::File::open(path).map_err(|e| LeadMergeError::io(path, e))?;
        parse_csv_rows(file, path)?
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| LeadMergeError::io(path, e))?;
        parse_json_rows(&content, path)?
    };

    info!(path = %path.display(), rows = rows.len(), "reference rows loaded");
    Ok(rows)
}

/// Parse CSV with a header row. Short rows simply lack trailing columns.
pub fn parse_csv_rows(reader: impl std::io::Read, path: &Path) -> Result<Vec<ReferenceRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| LeadMergeError::parse(format!("{}: invalid CSV header: {e}", path.display())))?
        .clone();

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| {
            LeadMergeError::parse(format!("{}: CSV row {}: {e}", path.display(), line + 1))
        })?;
        let row: ReferenceRow = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a JSON array of objects into string rows. Non-object elements
/// are ignored; null values become empty strings.
pub fn parse_json_rows(content: &str, path: &Path) -> Result<Vec<ReferenceRow>> {
    let value: Value = serde_json::from_str(content).map_err(|e| {
        LeadMergeError::parse(format!("{}: invalid JSON: {e}", path.display()))
    })?;

    let Value::Array(items) = value else {
        return Err(LeadMergeError::parse(format!(
            "{}: expected a JSON array of rows",
            path.display()
        )));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(column, value)| (column, cell_text(value)))
                    .collect(),
            ),
            _ => None,
        })
        .collect())
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
