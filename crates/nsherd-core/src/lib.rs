// # nsherd-core
//
// Core library for the nsherd dynamic-DNS reconciler.
//
// ## Architecture Overview
//
// nsherd observes desired-state sources (container labels, endpoint
// discovery) and converges an in-memory record table, pushing
// create/delete operations to DNS providers to match:
//
// - **RecordStore**: authoritative table of published records
// - **Reconciler**: turns desired batches into create/update/delete calls
// - **Expiry sweep**: TTL-based garbage collection with thrash protection
// - **Engine**: the polling loop (discover -> pull -> apply -> sweep)
// - **Traits**: seams for sources, discovery, providers, and NS lookups
//
// ## Concurrency Model
//
// One cycle runs to completion before the next starts; the record store
// has exactly one writer (the executing cycle) and needs no locking.
// Provider calls run under a bounded timeout so a hung call cannot stall
// the loop indefinitely.

pub mod config;
pub mod domain;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod provider;
pub mod record;
pub mod reconciler;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{ConfigResolver, Settings};
pub use endpoint::{AddressFamily, EndpointTable};
pub use engine::{CycleSummary, Engine, EngineEvent};
pub use error::{Error, Result};
pub use record::{BootstrapRecord, DesiredBatch, DesiredRecord, Record, SourceRef};
pub use reconciler::{ReconcileOutcome, Reconciler, SweepOutcome};
pub use store::{RecordStore, UpsertOutcome};
pub use traits::{DnsAction, DnsExecutor, DnsOp, EndpointDiscovery, ProviderResolver, RecordSource, RecordType};
