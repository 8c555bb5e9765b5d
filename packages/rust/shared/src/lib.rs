//! Shared types, error model, and configuration for LeadMerge.
//!
//! This crate is the foundation depended on by all other LeadMerge crates.
//! It provides:
//! - [`LeadMergeError`] — the unified error type
//! - Domain types ([`Record`], [`SourceBatch`], [`RunId`], [`RunReport`])
//! - Configuration ([`AppConfig`], [`DedupOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DedupConfig, DedupOptions, DefaultsConfig, KeyFields, KeysConfig,
    ReferenceConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_config,
};
pub use error::{LeadMergeError, Result};
pub use types::{
    CURRENT_REPORT_VERSION, DedupStats, ExclusionStats, Record, ReferenceRow, RunId, RunReport,
    SOURCE_FIELD, SourceBatch, SourceReport,
};
