//! Deduplication engine: ingest N sources, resolve identity, merge.
//!
//! Records are visited source by source, in the order given. Each keyed
//! tier is insertion-ordered, so identical input always produces identical
//! output. The entity map lives for exactly one run.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use leadmerge_shared::{DedupOptions, DedupStats, KeyFields, Record, SourceBatch};

use crate::identity::{IdentityKey, Tier, name_org_key, resolve};
use crate::merge::{merge, source_tags, tag_source};

// ---------------------------------------------------------------------------
// Entity map
// ---------------------------------------------------------------------------

/// One key tier: key → slot in an insertion-ordered record list.
#[derive(Debug, Default)]
struct KeyedTier {
    slots: HashMap<IdentityKey, usize>,
    records: Vec<Record>,
}

impl KeyedTier {
    /// Insert on miss, merge on hit. Returns `true` when a merge happened.
    fn upsert(&mut self, key: IdentityKey, record: Record) -> bool {
        match self.slots.get(&key) {
            Some(&slot) => {
                self.records[slot] = merge(&self.records[slot], &record);
                true
            }
            None => {
                self.slots.insert(key, self.records.len());
                self.records.push(record);
                false
            }
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// What happened to a single ingested record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// New entity in the given tier.
    Inserted(Tier),
    /// Merged into an existing entity of the given tier.
    Merged(Tier),
    /// No usable key; kept as is.
    Retained,
}

/// Current best-known record per entity, plus keyless records.
#[derive(Debug, Default)]
pub struct EntityMap {
    email: KeyedTier,
    name_org: KeyedTier,
    no_key: Vec<Record>,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `record` and fold it into the map.
    pub fn ingest(&mut self, record: Record, keys: &KeyFields) -> Ingested {
        let resolution = resolve(&record, keys);
        match resolution.key {
            Some(key) => {
                let tier = key.tier();
                let merged = match tier {
                    Tier::Email => self.email.upsert(key, record),
                    _ => self.name_org.upsert(key, record),
                };
                if merged {
                    Ingested::Merged(tier)
                } else {
                    Ingested::Inserted(tier)
                }
            }
            None => {
                self.no_key.push(record);
                Ingested::Retained
            }
        }
    }

    /// Fold name+org entities into the email entity sharing their name+org
    /// key. Only unambiguous matches (exactly one email entity) are folded.
    /// Returns the number of name+org entities removed.
    pub fn reconcile(&mut self, keys: &KeyFields) -> usize {
        let mut by_name_org: HashMap<IdentityKey, Vec<usize>> = HashMap::new();
        for (slot, record) in self.email.records.iter().enumerate() {
            if let Some(key) = name_org_key(record, keys) {
                by_name_org.entry(key).or_default().push(slot);
            }
        }
        if by_name_org.is_empty() {
            return 0;
        }

        let mut kept = KeyedTier::default();
        let mut folded = 0;
        let name_org = std::mem::take(&mut self.name_org);
        let mut entries: Vec<(IdentityKey, usize)> = name_org.slots.into_iter().collect();
        entries.sort_by_key(|(_, slot)| *slot);
        let mut records: Vec<Option<Record>> = name_org.records.into_iter().map(Some).collect();

        for (key, slot) in entries {
            let Some(record) = records[slot].take() else {
                continue;
            };
            match by_name_org.get(&key).map(Vec::as_slice) {
                Some([target]) => {
                    debug!(?key, "folding name+org entity into email entity");
                    self.email.records[*target] = merge(&self.email.records[*target], &record);
                    folded += 1;
                }
                _ => {
                    kept.upsert(key, record);
                }
            }
        }

        self.name_org = kept;
        folded
    }

    /// Number of records the map will emit.
    pub(crate) fn len(&self) -> usize {
        self.email.len() + self.name_org.len() + self.no_key.len()
    }

    /// Consume the map: email entities, then name+org entities, then
    /// keyless records.
    pub fn into_records(self) -> Vec<Record> {
        let mut out = self.email.records;
        out.extend(self.name_org.records);
        out.extend(self.no_key);
        out
    }
}

// ---------------------------------------------------------------------------
// Deduplicate
// ---------------------------------------------------------------------------

/// Deduplicated records plus run counters.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub records: Vec<Record>,
    pub stats: DedupStats,
}

/// Deduplicate records from all sources into one canonical set.
///
/// Never fails: a record lacking every identity field is retained as is.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn deduplicate(sources: Vec<SourceBatch>, options: &DedupOptions) -> DedupOutcome {
    let mut stats = DedupStats::default();
    let mut map = EntityMap::new();

    for batch in sources {
        *stats
            .source_input_counts
            .entry(batch.label.clone())
            .or_default() += batch.records.len();

        for mut record in batch.records {
            stats.raw_count += 1;
            tag_source(&mut record, &batch.label);

            if let Ingested::Merged(tier) = map.ingest(record, &options.keys) {
                stats.merge_count += 1;
                debug!(source = %batch.label, %tier, "merged duplicate");
            }
        }
    }

    if options.reconcile_tiers {
        stats.reconciled_count = map.reconcile(&options.keys);
        stats.merge_count += stats.reconciled_count;
    }

    stats.email_entities = map.email.len();
    stats.name_org_entities = map.name_org.len();
    stats.no_key_records = map.no_key.len();

    stats.result_count = map.len();
    let records = map.into_records();
    stats.duplicate_count = stats.raw_count - stats.result_count;

    for record in &records {
        let tags = source_tags(record);
        match tags.len() {
            0 => {}
            1 => stats.single_source_records += 1,
            _ => stats.multi_source_records += 1,
        }
        for tag in tags {
            *stats.source_presence.entry(tag).or_default() += 1;
        }
    }

    info!(
        raw = stats.raw_count,
        result = stats.result_count,
        duplicates = stats.duplicate_count,
        email = stats.email_entities,
        name_org = stats.name_org_entities,
        no_key = stats.no_key_records,
        "deduplication complete"
    );

    DedupOutcome { records, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn batch(label: &str, records: Vec<Value>) -> SourceBatch {
        SourceBatch::new(label, records.into_iter().map(record).collect())
    }

    fn run(sources: Vec<SourceBatch>) -> DedupOutcome {
        deduplicate(sources, &DedupOptions::default())
    }

    #[test]
    fn same_email_richer_record_wins() {
        let out = run(vec![batch(
            "apollo",
            vec![
                json!({"email": "a@x.com", "name": "Ann", "title": ""}),
                json!({"email": "A@X.COM", "name": "Ann", "title": "CEO"}),
            ],
        )]);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0]["title"], "CEO");
        assert!(!out.records[0]["email"].as_str().unwrap_or_default().is_empty());
        assert_eq!(out.stats.duplicate_count, 1);
    }

    #[test]
    fn name_org_tier_merges_without_email() {
        let out = run(vec![batch(
            "apify",
            vec![
                json!({"name": "Bob", "company_name": "Acme", "phone": ""}),
                json!({"name": "bob", "company_name": "acme", "phone": "555-1111"}),
            ],
        )]);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0]["phone"], "555-1111");
        assert_eq!(out.stats.name_org_entities, 1);
        assert_eq!(out.stats.email_entities, 0);
    }

    #[test]
    fn keyless_record_is_retained_unchanged_apart_from_source() {
        let out = run(vec![batch("apollo", vec![json!({"title": "Manager"})])]);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0]["title"], "Manager");
        assert_eq!(out.stats.no_key_records, 1);
        assert_eq!(out.stats.duplicate_count, 0);
    }

    #[test]
    fn keyless_records_never_merge() {
        let out = run(vec![batch(
            "a",
            vec![json!({"title": "Manager"}), json!({"title": "Manager"})],
        )]);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.stats.no_key_records, 2);
        assert_eq!(out.stats.duplicate_count, 0);
    }

    #[test]
    fn three_sources_union_tags() {
        let out = run(vec![
            batch("a", vec![json!({"email": "x@y.com"})]),
            batch("b", vec![json!({"email": "x@y.com"})]),
            batch("c", vec![json!({"email": "X@y.com "})]),
        ]);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0]["source"], "a,b,c");
        assert_eq!(out.stats.multi_source_records, 1);
        assert_eq!(out.stats.single_source_records, 0);
        assert_eq!(out.stats.source_presence.get("b"), Some(&1));
        assert_eq!(out.stats.merge_count, 2);
    }

    #[test]
    fn email_record_never_matches_via_name_org() {
        let out = run(vec![batch(
            "a",
            vec![
                json!({"name": "Ann", "company_name": "X"}),
                json!({"email": "ann@x.com", "name": "Ann", "company_name": "X"}),
            ],
        )]);

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.stats.email_entities, 1);
        assert_eq!(out.stats.name_org_entities, 1);
    }

    #[test]
    fn output_order_is_email_then_name_org_then_keyless() {
        let out = run(vec![batch(
            "a",
            vec![
                json!({"title": "lonely"}),
                json!({"name": "Bob", "company_name": "Acme"}),
                json!({"email": "b@x.com"}),
                json!({"email": "a@x.com"}),
            ],
        )]);

        let kinds: Vec<String> = out
            .records
            .iter()
            .map(|r| {
                r.get("email")
                    .or_else(|| r.get("name"))
                    .or_else(|| r.get("title"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["b@x.com", "a@x.com", "Bob", "lonely"]);
    }

    #[test]
    fn existing_source_tag_is_kept() {
        let out = run(vec![batch(
            "apify",
            vec![json!({"email": "a@x.com", "source": "apollo"})],
        )]);
        assert_eq!(out.records[0]["source"], "apify,apollo");
        assert_eq!(out.stats.source_input_counts.get("apify"), Some(&1));
    }

    #[test]
    fn single_source_tags_are_canonical() {
        let out = run(vec![batch(
            "a",
            vec![
                json!({"email": "a@x.com", "source": "b, a"}),
                json!({"title": "x", "source": ["a"]}),
            ],
        )]);

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0]["source"], "a,b");
        assert_eq!(out.records[1]["source"], "a");
    }

    #[test]
    fn entity_map_len_counts_every_tier() {
        let keys = KeyFields::default();
        let mut map = EntityMap::new();
        assert_eq!(map.len(), 0);

        assert_eq!(map.ingest(record(json!({"email": "a@x.com"})), &keys), Ingested::Inserted(Tier::Email));
        assert_eq!(map.ingest(record(json!({"email": "A@x.com"})), &keys), Ingested::Merged(Tier::Email));
        assert_eq!(
            map.ingest(record(json!({"name": "Bob", "company_name": "Acme"})), &keys),
            Ingested::Inserted(Tier::NameOrg)
        );
        assert_eq!(map.ingest(record(json!({"title": "x"})), &keys), Ingested::Retained);

        assert_eq!(map.len(), 3);
        assert_eq!(map.into_records().len(), 3);
    }

    #[test]
    fn empty_input() {
        let out = run(vec![]);
        assert!(out.records.is_empty());
        assert_eq!(out.stats, DedupStats::default());
    }

    // -----------------------------------------------------------------------
    // Tier reconciliation
    // -----------------------------------------------------------------------

    fn cross_tier_input() -> Vec<SourceBatch> {
        vec![
            batch("a", vec![json!({"name": "Ann", "company_name": "X", "phone": "1"})]),
            batch("b", vec![json!({"email": "ann@x.com", "name": "ann", "org_name": {"name": "x"}})]),
        ]
    }

    #[test]
    fn tiers_stay_independent_by_default() {
        let out = run(cross_tier_input());
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.stats.reconciled_count, 0);
    }

    #[test]
    fn reconcile_folds_unambiguous_match() {
        let options = DedupOptions {
            reconcile_tiers: true,
            ..Default::default()
        };
        let out = deduplicate(cross_tier_input(), &options);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0]["email"], "ann@x.com");
        assert_eq!(out.records[0]["phone"], "1");
        assert_eq!(out.records[0]["source"], "a,b");
        assert_eq!(out.stats.reconciled_count, 1);
        assert_eq!(out.stats.name_org_entities, 0);
        assert_eq!(out.stats.duplicate_count, 1);
    }

    #[test]
    fn reconcile_skips_ambiguous_match() {
        let options = DedupOptions {
            reconcile_tiers: true,
            ..Default::default()
        };
        let out = deduplicate(
            vec![batch(
                "a",
                vec![
                    json!({"email": "ann@x.com", "name": "Ann", "company_name": "X"}),
                    json!({"email": "ann.lee@x.com", "name": "Ann", "company_name": "X"}),
                    json!({"name": "Ann", "company_name": "X"}),
                ],
            )],
            &options,
        );

        assert_eq!(out.records.len(), 3);
        assert_eq!(out.stats.reconciled_count, 0);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_lead() -> impl Strategy<Value = Record> {
        (
            prop::option::of("[ab]@x\\.com"),
            prop::option::of("(ann|bob)"),
            prop::option::of("(acme|initech)"),
            prop::option::of("[a-z]{0,3}"),
        )
            .prop_map(|(email, name, org, title)| {
                let mut r = Record::new();
                for (field, value) in [
                    ("email", email),
                    ("name", name),
                    ("company_name", org),
                    ("title", title),
                ] {
                    if let Some(v) = value {
                        r.insert(field.into(), Value::String(v));
                    }
                }
                r
            })
    }

    proptest! {
        /// |result| = distinct email keys + distinct name+org keys + keyless.
        #[test]
        fn no_data_loss(leads in prop::collection::vec(arb_lead(), 0..20)) {
            let keys = KeyFields::default();
            let mut distinct = std::collections::HashSet::new();
            let mut keyless = 0;
            for lead in &leads {
                match resolve(lead, &keys).key {
                    Some(key) => { distinct.insert(key); }
                    None => keyless += 1,
                }
            }

            let out = run(vec![SourceBatch::new("s", leads.clone())]);
            prop_assert_eq!(out.records.len(), distinct.len() + keyless);
            prop_assert_eq!(out.stats.raw_count, leads.len());
            prop_assert_eq!(
                out.stats.duplicate_count,
                leads.len() - out.records.len()
            );
        }
    }
}
