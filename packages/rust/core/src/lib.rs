//! Deduplication and merge engine for multi-source lead records.
//!
//! Records from independent providers are keyed by email, or by
//! name + organization when email is missing, and duplicates are merged
//! into one canonical record. The [`pipeline`] module ties loading,
//! deduplication, reference exclusion and output together.

pub mod engine;
pub mod exclusion;
pub mod identity;
pub mod merge;
pub mod normalize;
pub mod pipeline;

pub use engine::{DedupOutcome, EntityMap, Ingested, deduplicate};
pub use exclusion::{ExclusionOutcome, exclude_by_reference, reference_emails};
pub use identity::{IdentityKey, Resolution, Tier, resolve};
pub use merge::{completeness, merge};
pub use normalize::{normalize, resolve_org_name};
