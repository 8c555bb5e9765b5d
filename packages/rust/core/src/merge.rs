//! Completeness-based record merging with provenance union.
//!
//! The more complete record becomes the base; the other one only fills gaps.
//! `source` is never subject to precedence: it is always the sorted union
//! of both records' tags.

use std::collections::BTreeSet;

use serde_json::Value;

use leadmerge_shared::{Record, SOURCE_FIELD};

use crate::normalize::{display_value, is_blank};

/// Number of fields whose value is non-blank.
pub fn completeness(record: &Record) -> usize {
    record.values().filter(|v| !is_blank(v)).count()
}

/// Merge two records believed to describe the same entity.
///
/// The record with the strictly higher [`completeness`] is the base; on a
/// tie `incoming` wins. Blank or absent base fields are filled from the
/// other record; non-blank base values are never overwritten. Field names
/// only present in the other record are always carried over.
pub fn merge(existing: &Record, incoming: &Record) -> Record {
    let (base, other) = if completeness(existing) > completeness(incoming) {
        (existing, incoming)
    } else {
        (incoming, existing)
    };

    let mut merged = base.clone();
    for (field, value) in other {
        if field == SOURCE_FIELD {
            continue;
        }
        match merged.get(field) {
            None => {
                merged.insert(field.clone(), value.clone());
            }
            Some(current) if is_blank(current) && !is_blank(value) => {
                merged.insert(field.clone(), value.clone());
            }
            Some(_) => {}
        }
    }

    let mut tags = source_tags(existing);
    tags.extend(source_tags(incoming));
    if !tags.is_empty() {
        merged.insert(SOURCE_FIELD.into(), Value::String(join_tags(&tags)));
    }

    merged
}

// ---------------------------------------------------------------------------
// Provenance tags
// ---------------------------------------------------------------------------

/// Parse the `source` field into a tag set. Comma-separated strings and
/// arrays of strings are both accepted; blank tags are dropped.
pub fn source_tags(record: &Record) -> BTreeSet<String> {
    let Some(value) = record.get(SOURCE_FIELD) else {
        return BTreeSet::new();
    };

    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().map(display_value).collect(),
        other => vec![display_value(other)],
    };

    raw.iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Comma-join a tag set (already sorted and unique).
pub fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Add `label` to the record's `source` tags if it is not already there,
/// and rewrite `source` as a sorted comma list. A blank label leaves the
/// record untouched.
pub fn tag_source(record: &mut Record, label: &str) {
    let label = label.trim();
    if label.is_empty() {
        return;
    }
    let mut tags = source_tags(record);
    tags.insert(label.to_string());
    record.insert(SOURCE_FIELD.into(), Value::String(join_tags(&tags)));
}
