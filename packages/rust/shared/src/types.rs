//! Core domain types for LeadMerge runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the run report format.
pub const CURRENT_REPORT_VERSION: u32 = 1;

/// Field carrying the comma-joined provenance tags of a record.
pub const SOURCE_FIELD: &str = "source";

/// One lead record: arbitrary field name → JSON value. No schema is enforced.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One string row of a reference (exclusion) table, keyed by column name.
pub type ReferenceRow = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// SourceBatch
// ---------------------------------------------------------------------------

/// Records produced by a single upstream provider, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    /// Provenance tag added to every record's `source` field.
    pub label: String,
    pub records: Vec<Record>,
}

impl SourceBatch {
    pub fn new(label: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one deduplication run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Counters produced by one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    /// Records ingested across all sources.
    pub raw_count: usize,
    /// Records emitted.
    pub result_count: usize,
    /// `raw_count - result_count`.
    pub duplicate_count: usize,
    /// Number of merge operations performed.
    pub merge_count: usize,
    /// Entities keyed by email.
    pub email_entities: usize,
    /// Entities keyed by name + organization.
    pub name_org_entities: usize,
    /// Records retained without any usable key.
    pub no_key_records: usize,
    /// Name+org entities folded into an email entity after ingest.
    #[serde(default)]
    pub reconciled_count: usize,
    /// Emitted records carrying exactly one source tag.
    pub single_source_records: usize,
    /// Emitted records carrying more than one source tag.
    pub multi_source_records: usize,
    /// Records ingested per source label.
    pub source_input_counts: BTreeMap<String, usize>,
    /// Emitted records tagged with each source label.
    pub source_presence: BTreeMap<String, usize>,
}

/// Outcome counters of reference-set exclusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionStats {
    /// Distinct usable emails in the reference set.
    pub reference_size: usize,
    pub removed: usize,
    pub remaining: usize,
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Summary of a completed run, written as JSON next to the merged output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward compatibility.
    pub report_version: u32,
    pub run_id: RunId,
    /// Tool version that produced the run.
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Input files by source label, in ingest order.
    pub sources: Vec<SourceReport>,
    pub dedup: DedupStats,
    /// Present only when a reference file was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<ExclusionStats>,
    /// Where the merged records were written.
    pub output_path: PathBuf,
}

/// Per-source line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub label: String,
    pub path: PathBuf,
    /// Records loaded from the file.
    pub records: usize,
    /// Non-object array elements skipped while loading.
    #[serde(default)]
    pub skipped: usize,
}
