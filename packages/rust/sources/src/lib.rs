//! Boundary I/O for LeadMerge.
//!
//! This crate provides:
//! - [`loader`] — provider JSON files → [`SourceBatch`](leadmerge_shared::SourceBatch)
//! - [`reference`] — exclusion lists from CSV or JSON
//! - [`writer`] — merged records and run reports as JSON

pub mod loader;
pub mod reference;
pub mod writer;

pub use loader::{LoadedSource, SourceSpec, load_source, load_sources, parse_source};
pub use reference::{load_reference_rows, parse_csv_rows, parse_json_rows};
pub use writer::{write_records, write_report};
