//! End-to-end `dedup` pipeline: load → deduplicate → exclude → write.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use leadmerge_shared::{
    CURRENT_REPORT_VERSION, DedupOptions, LeadMergeError, Result, RunId, RunReport, SourceBatch,
};
use leadmerge_sources::{SourceSpec, load_reference_rows, load_sources, write_records, write_report};

use crate::engine::deduplicate;
use crate::exclusion::{exclude_by_reference, reference_emails};

/// Configuration for the `run` pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Sources in ingest order.
    pub sources: Vec<SourceSpec>,
    /// Optional exclusion list (CSV or JSON rows).
    pub reference: Option<PathBuf>,
    /// Accepted email column spellings in the reference file.
    pub email_columns: Vec<String>,
    /// Where merged records are written.
    pub output_path: PathBuf,
    /// Where the run report is written, if anywhere.
    pub report_path: Option<PathBuf>,
    pub dedup: DedupOptions,
    /// Tool version string.
    pub tool_version: String,
}

/// Result of the `run` pipeline.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: RunId,
    pub output_path: PathBuf,
    pub report: RunReport,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per loaded source.
    fn source_loaded(&self, label: &str, records: usize, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_loaded(&self, _label: &str, _records: usize, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// Run the full pipeline.
///
/// 1. Load every source (a bad source aborts the run)
/// 2. Deduplicate across sources
/// 3. Exclude records found in the reference list, if one is given
/// 4. Write merged records and the run report
#[instrument(skip_all, fields(sources = config.sources.len(), output = %config.output_path.display()))]
pub async fn run(config: &RunConfig, progress: &dyn ProgressReporter) -> Result<RunResult> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    if config.sources.is_empty() {
        return Err(LeadMergeError::validation("at least one source is required"));
    }

    info!(%run_id, "starting dedup run");

    // --- Phase 1: Load ---
    progress.phase("Loading sources");
    let loaded = load_sources(&config.sources).await?;
    let total = loaded.len();
    for (i, source) in loaded.iter().enumerate() {
        progress.source_loaded(&source.batch.label, source.batch.records.len(), i + 1, total);
    }
    let source_reports: Vec<_> = loaded.iter().map(|l| l.report()).collect();
    let batches: Vec<SourceBatch> = loaded.into_iter().map(|l| l.batch).collect();

    // --- Phase 2: Deduplicate ---
    progress.phase("Deduplicating records");
    let outcome = deduplicate(batches, &config.dedup);
    let mut records = outcome.records;

    // --- Phase 3: Reference exclusion ---
    let exclusion = match &config.reference {
        Some(path) => {
            progress.phase("Applying reference list");
            let rows = load_reference_rows(path)?;
            let reference = reference_emails(&rows, &config.email_columns);
            let excluded = exclude_by_reference(records, &reference, &config.dedup.keys.email);
            let stats = excluded.stats(reference.len());
            records = excluded.kept;
            Some(stats)
        }
        None => None,
    };

    // --- Phase 4: Write ---
    progress.phase("Writing output");
    write_records(&config.output_path, &records)?;

    let report = RunReport {
        report_version: CURRENT_REPORT_VERSION,
        run_id: run_id.clone(),
        tool_version: config.tool_version.clone(),
        started_at,
        finished_at: Utc::now(),
        sources: source_reports,
        dedup: outcome.stats,
        exclusion,
        output_path: config.output_path.clone(),
    };
    if let Some(path) = &config.report_path {
        write_report(path, &report)?;
    }

    let result = RunResult {
        run_id,
        output_path: config.output_path.clone(),
        report,
        elapsed: start.elapsed(),
    };

    info!(
        written = records.len(),
        duplicates = result.report.dedup.duplicate_count,
        elapsed_ms = result.elapsed.as_millis(),
        "dedup run complete"
    );
    progress.done(&result);

    Ok(result)
}
