//! Reference-set exclusion: drop records whose email is already known.
//!
//! Matching is email-only. A record with a blank email can never be
//! matched and is always kept.

use std::collections::HashSet;

use tracing::info;

use leadmerge_shared::{ExclusionStats, Record, ReferenceRow};

use crate::normalize::{normalize_str, normalized_field};

/// Records that survived exclusion, plus how many were dropped.
#[derive(Debug, Clone, Default)]
pub struct ExclusionOutcome {
    pub kept: Vec<Record>,
    pub removed: usize,
}

impl ExclusionOutcome {
    pub fn stats(&self, reference_size: usize) -> ExclusionStats {
        ExclusionStats {
            reference_size,
            removed: self.removed,
            remaining: self.kept.len(),
        }
    }
}

/// Build the normalized email set from tabular reference rows.
///
/// For each row the first accepted column name present in the row is
/// consulted (exact, case-sensitive, in `email_columns` order). Blank
/// values contribute nothing; a present but blank column does not fall
/// through to later spellings.
pub fn reference_emails(rows: &[ReferenceRow], email_columns: &[String]) -> HashSet<String> {
    rows.iter()
        .filter_map(|row| email_columns.iter().find_map(|column| row.get(column)))
        .map(|raw| normalize_str(raw))
        .filter(|email| !email.is_empty())
        .collect()
}

/// Drop every record whose normalized email is non-empty and in `reference`.
pub fn exclude_by_reference(
    records: Vec<Record>,
    reference: &HashSet<String>,
    email_field: &str,
) -> ExclusionOutcome {
    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            let email = normalized_field(record, email_field);
            email.is_empty() || !reference.contains(&email)
        })
        .collect();

    let outcome = ExclusionOutcome {
        removed: before - kept.len(),
        kept,
    };
    info!(
        removed = outcome.removed,
        remaining = outcome.kept.len(),
        "reference exclusion applied"
    );
    outcome
}
