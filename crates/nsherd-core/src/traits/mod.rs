//! Collaborator traits for the nsherd system
//!
//! These are the seams between the reconciliation engine and the outside
//! world:
//!
//! - [`DnsExecutor`]: perform one create/delete call against a provider API
//! - [`RecordSource`]: pull a batch of desired-record observations
//! - [`EndpointDiscovery`]: resolve named endpoints to addresses
//! - [`ProviderResolver`]: guess DNS provider names for a hostname

pub mod discovery;
pub mod executor;
pub mod resolver;
pub mod source;

pub use discovery::EndpointDiscovery;
pub use executor::{DnsAction, DnsExecutor, DnsOp, DryRunExecutor, RecordType};
pub use resolver::{NameserverLookup, ProviderResolver};
pub use source::RecordSource;
