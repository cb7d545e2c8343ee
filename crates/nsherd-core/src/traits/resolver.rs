// # Provider Resolver Trait
//
// Defines the interface for guessing which DNS provider hosts a given
// hostname, used when a record carries no explicit provider override.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for DNS provider auto-detection
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Candidate provider names for a hostname, in stable order
    ///
    /// Fails soft: an empty vector means "cannot automatically determine a
    /// provider", which callers treat as a per-record failure for the
    /// cycle. `Err` is reserved for conditions the caller may want to
    /// distinguish (none in the baseline implementation).
    async fn candidates(&self, hostname: &str) -> Result<Vec<String>>;
}

/// Trait for raw NS record lookups
///
/// Split out of [`ProviderResolver`] so the nameserver-directory matching
/// logic can be tested without touching the network.
#[async_trait]
pub trait NameserverLookup: Send + Sync {
    /// Authoritative nameserver hostnames for a registrable domain
    async fn lookup(&self, domain: &str) -> Result<Vec<String>>;
}
