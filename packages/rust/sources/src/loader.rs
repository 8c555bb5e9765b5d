//! Source file loading.
//!
//! Each provider persists its leads as a JSON array of objects. Non-object
//! elements are skipped and counted; anything that is not an array fails
//! the whole source.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use leadmerge_shared::{LeadMergeError, Record, Result, SourceBatch, SourceReport};

/// A source to load: provenance label + file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub label: String,
    pub path: PathBuf,
}

impl SourceSpec {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Parse `label=path` or a bare `path` (label = file stem).
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(LeadMergeError::validation("empty source spec"));
        }

        if let Some((label, path)) = spec.split_once('=') {
            let (label, path) = (label.trim(), path.trim());
            if label.is_empty() || path.is_empty() {
                return Err(LeadMergeError::validation(format!(
                    "invalid source spec '{spec}': expected label=path"
                )));
            }
            return Ok(Self::new(label, path));
        }

        let path = PathBuf::from(spec);
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                LeadMergeError::validation(format!("cannot derive a label from '{spec}'"))
            })?;
        Ok(Self { label, path })
    }
}

/// A loaded source together with what was skipped while loading it.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub batch: SourceBatch,
    pub path: PathBuf,
    /// Non-object array elements dropped.
    pub skipped: usize,
}

impl LoadedSource {
    pub fn report(&self) -> SourceReport {
        SourceReport {
            label: self.batch.label.clone(),
            path: self.path.clone(),
            records: self.batch.records.len(),
            skipped: self.skipped,
        }
    }
}

/// Parse the contents of a source file.
pub fn parse_source(label: &str, path: &Path, content: &str) -> Result<LoadedSource> {
    let value: Value = serde_json::from_str(content).map_err(|e| {
        LeadMergeError::parse(format!("{}: invalid JSON: {e}", path.display()))
    })?;

    let Value::Array(items) = value else {
        return Err(LeadMergeError::parse(format!(
            "{}: expected a JSON array of records",
            path.display()
        )));
    };

    let total = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
    let skipped = total - records.len();

    if skipped > 0 {
        warn!(source = label, path = %path.display(), skipped, "skipped non-object elements");
    }

    Ok(LoadedSource {
        batch: SourceBatch::new(label, records),
        path: path.to_path_buf(),
        skipped,
    })
}

/// Load one source file.
pub async fn load_source(spec: &SourceSpec) -> Result<LoadedSource> {
    let content = tokio::fs::read_to_string(&spec.path)
        .await
        .map_err(|e| LeadMergeError::io(&spec.path, e))?;
    let loaded = parse_source(&spec.label, &spec.path, &content)?;
    debug!(
        source = %spec.label,
        records = loaded.batch.records.len(),
        "source loaded"
    );
    Ok(loaded)
}

/// Load all sources concurrently. Output order matches `specs`; the first
/// failing source aborts the load.
#[instrument(skip_all, fields(sources = specs.len()))]
pub async fn load_sources(specs: &[SourceSpec]) -> Result<Vec<LoadedSource>> {
    let mut tasks = JoinSet::new();
    for (index, spec) in specs.iter().cloned().enumerate() {
        tasks.spawn(async move { (index, load_source(&spec).await) });
    }

    let mut slots: Vec<Option<LoadedSource>> = vec![None; specs.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.map_err(|e| {
            LeadMergeError::validation(format!("source loader task failed: {e}"))
        })?;
        slots[index] = Some(result?);
    }

    let loaded: Vec<LoadedSource> = slots.into_iter().flatten().collect();
    info!(
        sources = loaded.len(),
        records = loaded.iter().map(|l| l.batch.records.len()).sum::<usize>(),
        "all sources loaded"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_with_label() {
        let spec = SourceSpec::parse("apollo=leads/apollo_2026.json").expect("parse");
        assert_eq!(spec.label, "apollo");
        assert_eq!(spec.path, PathBuf::from("leads/apollo_2026.json"));
    }

    #[test]
    fn spec_label_from_stem() {
        let spec = SourceSpec::parse("leads/apify.json").expect("parse");
        assert_eq!(spec.label, "apify");
    }

    #[test]
    fn spec_rejects_blank_parts() {
        assert!(SourceSpec::parse("=leads.json").is_err());
        assert!(SourceSpec::parse("apollo=").is_err());
        assert!(SourceSpec::parse("  ").is_err());
    }

    #[test]
    fn parse_skips_non_objects() {
        let loaded = parse_source(
            "apify",
            Path::new("apify.json"),
            r#"[{"email": "a@x.com"}, "junk", null, {"name": "Bob"}]"#,
        )
        .expect("parse");
        assert_eq!(loaded.batch.records.len(), 2);
        assert_eq!(loaded.skipped, 2);
        assert_eq!(loaded.report().records, 2);
    }

    #[test]
    fn parse_rejects_non_array() {
        let err = parse_source("apify", Path::new("apify.json"), r#"{"email": "a@x.com"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse_source("apify", Path::new("apify.json"), "[{").unwrap_err();
        assert!(matches!(err, LeadMergeError::Parse { .. }));
    }

    #[test]
    fn fixture_sources_parse() {
        let content = std::fs::read_to_string("../../../fixtures/json/apify.fixture.json")
            .expect("read fixture");
        let loaded = parse_source("apify", Path::new("apify.fixture.json"), &content)
            .expect("parse fixture");
        assert_eq!(loaded.batch.records.len(), 2);
        assert_eq!(loaded.skipped, 1);
    }

    #[tokio::test]
    async fn load_sources_preserves_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut specs = Vec::new();
        for (label, count) in [("apollo", 3), ("apify", 1), ("hunter", 2)] {
            let path = dir.path().join(format!("{label}.json"));
            let records: Vec<Value> = (0..count)
                .map(|i| serde_json::json!({"email": format!("{label}{i}@x.com")}))
                .collect();
            std::fs::write(&path, serde_json::to_string(&records).expect("json")).expect("write");
            specs.push(SourceSpec::new(label, path));
        }

        let loaded = load_sources(&specs).await.expect("load");
        let labels: Vec<&str> = loaded.iter().map(|l| l.batch.label.as_str()).collect();
        assert_eq!(labels, vec!["apollo", "apify", "hunter"]);
        assert_eq!(loaded[0].batch.records.len(), 3);
    }

    #[tokio::test]
    async fn missing_source_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let spec = SourceSpec::new("ghost", dir.path().join("missing.json"));
        let err = load_sources(&[spec]).await.unwrap_err();
        assert!(matches!(err, LeadMergeError::Io { .. }));
    }
}
