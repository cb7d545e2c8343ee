//! The record model: one DNS name under management
//!
//! A [`Record`] tracks which named endpoints a hostname publishes, who
//! claims the record ([`SourceRef`] provenance), when it was last confirmed
//! (`found`), and how long it may go unconfirmed before the expiry sweeper
//! collects it (`ttl`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a record observation
///
/// A source identifies the observer claiming that a record should exist,
/// e.g. `("docker", "container", "<id>")`. Two sources are considered the
/// same observation when their `(kind, id)` pair matches; the `name` of the
/// observing system is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Observing system (e.g. `docker`, `system`)
    pub name: String,

    /// Kind of observed object (e.g. `container`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Identifier of the observed object
    pub id: String,
}

impl SourceRef {
    /// Create a source reference
    pub fn new(name: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Whether two sources describe the same observation
    pub fn same_observation(&self, other: &SourceRef) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

/// A DNS record under management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Fully-qualified hostname; unique key in the record store
    pub hostname: String,

    /// Named endpoints this record publishes; never empty for a live record
    pub endpoints: Vec<String>,

    /// Observers claiming this record, deduplicated by `(kind, id)`
    pub sources: Vec<SourceRef>,

    /// Timestamp of the last confirming observation; only moves forward
    pub found: DateTime<Utc>,

    /// Seconds until expiry. `Some(0)` means "never expire"; `None` falls
    /// back to the configured default at sweep time.
    pub ttl: Option<u64>,

    /// Optional provider override; resolved dynamically when absent
    pub provider: Option<String>,
}

impl Record {
    /// Create a permanent record exempt from expiry sweeps
    ///
    /// Used for static bootstrap entries seeded at engine startup.
    pub fn bootstrap(hostname: impl Into<String>, endpoints: Vec<String>) -> Self {
        Self {
            hostname: hostname.into(),
            endpoints,
            sources: vec![SourceRef::new("system", "bootstrap", "0")],
            found: Utc::now(),
            ttl: Some(0),
            provider: None,
        }
    }

    /// Merge incoming sources, skipping duplicates of `(kind, id)`
    pub fn merge_sources(&mut self, incoming: &[SourceRef]) {
        for source in incoming {
            if !self.sources.iter().any(|s| s.same_observation(source)) {
                self.sources.push(source.clone());
            }
        }
    }
}

/// A record observation pulled from a desired-state source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Fully-qualified hostname to publish
    pub hostname: String,

    /// Endpoint names whose addresses should be published
    pub endpoints: Vec<String>,

    /// Observers claiming this record
    pub sources: Vec<SourceRef>,

    /// Optional provider override
    #[serde(default)]
    pub provider: Option<String>,
}

/// A batch of desired records keyed by record key, in stable order
pub type DesiredBatch = BTreeMap<String, DesiredRecord>;

/// A static record seeded into the store at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRecord {
    /// Hostname of the permanent record
    pub hostname: String,

    /// Endpoint names the record publishes
    pub endpoints: Vec<String>,
}
