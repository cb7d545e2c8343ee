//! The record store: the authoritative in-memory table of published records
//!
//! The store owns every [`Record`] instance and is constructed explicitly
//! and handed to the reconciler — there is no process-global table. It
//! exposes no locking; the engine's single-writer cycle discipline is the
//! concurrency model (see the crate docs).

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::Utc;
use tracing::debug;

use crate::record::{DesiredRecord, Record};

/// Outcome of an upsert against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Hostname was unknown; a new record was inserted
    Created,
    /// Hostname was known with a matching endpoint set; sources merged,
    /// freshness bumped
    Refreshed,
    /// Hostname was known with a different endpoint set; the store was NOT
    /// mutated — the caller drives the provider-delete path and the record
    /// is recreated on a later cycle
    Replaced,
}

/// In-memory table of currently published records, keyed by hostname
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Record>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile one desired observation into the store
    ///
    /// - Unknown hostname: insert with `found = now` and the given TTL.
    /// - Known hostname, incoming endpoint set of equal cardinality:
    ///   treated as a refresh. Sources are merged (dedup by `(kind, id)`),
    ///   `found` is bumped; `endpoints`, `ttl` and `provider` keep their
    ///   original values. Only the endpoint *count* is compared, not the
    ///   names — see `refresh_compares_endpoint_count_only` in the tests.
    /// - Known hostname, differing cardinality: [`UpsertOutcome::Replaced`],
    ///   no mutation.
    pub fn upsert(&mut self, desired: &DesiredRecord, ttl: u64) -> UpsertOutcome {
        match self.records.entry(desired.hostname.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Record {
                    hostname: desired.hostname.clone(),
                    endpoints: desired.endpoints.clone(),
                    sources: dedup_sources(&desired.sources),
                    found: Utc::now(),
                    ttl: Some(ttl),
                    provider: desired.provider.clone(),
                });
                UpsertOutcome::Created
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if existing.endpoints.len() != desired.endpoints.len() {
                    debug!(
                        hostname = %desired.hostname,
                        previous = existing.endpoints.len(),
                        incoming = desired.endpoints.len(),
                        "endpoint set changed"
                    );
                    UpsertOutcome::Replaced
                } else {
                    existing.merge_sources(&desired.sources);
                    existing.found = Utc::now();
                    UpsertOutcome::Refreshed
                }
            }
        }
    }

    /// Insert a fully-formed record, replacing any previous entry
    ///
    /// Used for bootstrap seeding; regular reconciliation goes through
    /// [`RecordStore::upsert`].
    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.hostname.clone(), record);
    }

    /// Remove a record, returning it if it was present
    pub fn remove(&mut self, hostname: &str) -> Option<Record> {
        self.records.remove(hostname)
    }

    /// Look up a record by hostname
    pub fn get(&self, hostname: &str) -> Option<&Record> {
        self.records.get(hostname)
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Number of records in the store
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn dedup_sources(sources: &[crate::record::SourceRef]) -> Vec<crate::record::SourceRef> {
    let mut out: Vec<crate::record::SourceRef> = Vec::with_capacity(sources.len());
    for source in sources {
        if !out.iter().any(|s| s.same_observation(source)) {
            out.push(source.clone());
        }
    }
    out
}
