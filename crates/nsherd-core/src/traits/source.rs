// # Record Source Trait
//
// Defines the interface for desired-state sources: observers that report
// which records should currently exist.
//
// ## Implementations
//
// - Docker labels: `nsherd-source-docker` crate
// - Future: Kubernetes annotations, static files

use async_trait::async_trait;

use crate::error::Result;
use crate::record::DesiredBatch;

/// Trait for desired-state sources
///
/// A source is an observer, not a decision-maker: it reports observations
/// and the reconciler decides what to create, refresh, or delete. Sources
/// must not call provider APIs or mutate the record store.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Pull the current batch of desired records
    ///
    /// An empty batch is a valid answer ("nothing observed"); errors are
    /// for failures to observe at all. The engine treats a failed pull as
    /// an empty batch for that cycle and logs it.
    async fn pull(&self) -> Result<DesiredBatch>;

    /// Short name of the source, for logging
    fn name(&self) -> &'static str;
}
