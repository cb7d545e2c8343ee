// # Endpoint Discovery Trait
//
// Defines the interface for resolving named endpoints ("public",
// "private", "local") to concrete addresses.
//
// ## Implementations
//
// - HTTP lookup services + local probes: `nsherd-endpoint-http` crate

use async_trait::async_trait;

use crate::endpoint::EndpointTable;
use crate::error::Result;

/// Trait for endpoint discovery implementations
///
/// Discovery runs once per reconciliation cycle. Implementations must
/// always include a `local` loopback entry and should degrade gracefully:
/// a lookup service being down means that endpoint is omitted, not that
/// discovery fails.
#[async_trait]
pub trait EndpointDiscovery: Send + Sync {
    /// Resolve the current endpoint table
    async fn discover(&self) -> Result<EndpointTable>;

    /// Short name of the discovery backend, for logging
    fn name(&self) -> &'static str;
}
