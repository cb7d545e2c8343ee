//! The reconciler: converging published DNS state onto desired state
//!
//! Given a batch of desired records and the current record store, the
//! reconciler computes and applies create/delete operations against the
//! provider execution client:
//!
//! ```text
//! ┌────────────────┐   desired batch   ┌──────────────┐
//! │ RecordSource   │ ────────────────> │  Reconciler  │
//! └────────────────┘                   └──────────────┘
//!                                        │    │    │
//!                          ┌─────────────┘    │    └─────────────┐
//!                          ▼                  ▼                  ▼
//!                  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!                  │ RecordStore  │   │ DnsExecutor  │   │ProviderResolv│
//!                  │ (upsert)     │   │ (create/del) │   │ (NS guess)   │
//!                  └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Provider call failures are never fatal: they are aggregated into a
//! boolean error flag and the store is left so that the next cycle
//! retries. The expiry sweep shares the delete path, so a record whose
//! delete fails stays in the store and is collected again on the next
//! sweep.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::domain::{DomainParts, split_hostname};
use crate::endpoint::{AddressFamily, EndpointTable};
use crate::error::{Error, Result};
use crate::expiry;
use crate::record::{DesiredBatch, DesiredRecord};
use crate::store::{RecordStore, UpsertOutcome};
use crate::traits::executor::{DnsAction, DnsExecutor, DnsOp, RecordType};
use crate::traits::resolver::ProviderResolver;

/// Aggregate result of one [`Reconciler::apply`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Records newly inserted and published
    pub created: usize,

    /// Records confirmed without provider calls
    pub refreshed: usize,

    /// Records whose endpoint set changed and were torn down
    pub replaced: usize,

    /// Whether any per-record operation failed this pass
    pub errors: bool,
}

/// Aggregate result of one [`Reconciler::sweep`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Hostnames flagged as expired this sweep
    pub expired: Vec<String>,

    /// Whether any delete failed (failed records stay in the store)
    pub errors: bool,
}

/// The core convergence engine
///
/// Owns the record store and the most recent endpoint table; the engine
/// cycle is the single writer (see crate docs for the concurrency model).
pub struct Reconciler {
    store: RecordStore,
    executor: Box<dyn DnsExecutor>,
    resolver: Box<dyn ProviderResolver>,
    endpoints: EndpointTable,
    settings: Settings,
}

impl Reconciler {
    /// Create a reconciler over an empty store
    ///
    /// The endpoint table starts with only the `local` loopback entry and
    /// is replaced by [`Reconciler::update_endpoints`] every cycle.
    pub fn new(
        executor: Box<dyn DnsExecutor>,
        resolver: Box<dyn ProviderResolver>,
        settings: Settings,
    ) -> Self {
        Self {
            store: RecordStore::new(),
            executor,
            resolver,
            endpoints: EndpointTable::with_local(),
            settings,
        }
    }

    /// The record store (read access)
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The record store (write access, for bootstrap seeding and tests)
    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    /// Replace the cached endpoint table with a freshly discovered one
    ///
    /// The previous table is kept on discovery failure so the delete path
    /// can still resolve last-known addresses.
    pub fn update_endpoints(&mut self, table: EndpointTable) {
        if !table.contains("local") {
            warn!("discovered endpoint table is missing the local entry");
        }
        self.endpoints = table;
    }

    /// Converge the store and provider state onto a desired batch
    ///
    /// An empty batch is a no-op, not an error. Per-record failures set
    /// the aggregate error flag but never abort the rest of the batch.
    pub async fn apply(&mut self, desired: &DesiredBatch) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        for (key, record) in desired {
            debug!(key = %key, hostname = %record.hostname, "reconciling desired record");

            let parts = match split_hostname(&record.hostname) {
                Ok(parts) => parts,
                Err(e) => {
                    error!(hostname = %record.hostname, error = %e, "skipping record");
                    outcome.errors = true;
                    continue;
                }
            };

            let provider = match self
                .resolve_provider(&record.hostname, record.provider.as_deref())
                .await
            {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(hostname = %record.hostname, error = %e, "skipping record this cycle");
                    outcome.errors = true;
                    continue;
                }
            };

            match self.store.upsert(record, self.settings.default_ttl) {
                UpsertOutcome::Created => {
                    outcome.created += 1;
                    if !self.publish(&provider, &parts, record).await {
                        outcome.errors = true;
                    }
                }
                UpsertOutcome::Replaced => {
                    outcome.replaced += 1;
                    info!(
                        hostname = %record.hostname,
                        "endpoint set changed, deleting record"
                    );
                    // No create in the same pass: the record reappears in a
                    // later batch and is recreated then.
                    if self.delete_records(&[record.hostname.clone()]).await {
                        outcome.errors = true;
                    }
                }
                UpsertOutcome::Refreshed => {
                    outcome.refreshed += 1;
                    debug!(hostname = %record.hostname, "record refreshed");
                }
            }
        }

        outcome
    }

    /// Delete the given records from the provider and, on success, from
    /// the store
    ///
    /// Shared by the replace path and the expiry sweeper. A hostname
    /// missing from the store was already removed by a racing path and is
    /// not an error. Returns whether any delete failed.
    pub async fn delete_records(&mut self, hostnames: &[String]) -> bool {
        let mut has_error = false;

        for hostname in hostnames {
            let Some((endpoints, provider_override)) = self
                .store
                .get(hostname)
                .map(|r| (r.endpoints.clone(), r.provider.clone()))
            else {
                debug!(hostname = %hostname, "record already removed, skipping delete");
                continue;
            };

            let parts = match split_hostname(hostname) {
                Ok(parts) => parts,
                Err(e) => {
                    error!(hostname = %hostname, error = %e, "cannot delete record");
                    has_error = true;
                    continue;
                }
            };

            let provider = match self
                .resolve_provider(hostname, provider_override.as_deref())
                .await
            {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(hostname = %hostname, error = %e, "delete deferred to next cycle");
                    has_error = true;
                    continue;
                }
            };

            let mut deleted = true;
            for endpoint in &endpoints {
                // Deletes address the A record with the endpoint's
                // last-known IPv4 address.
                let Some(addr) = self.endpoints.address(endpoint, AddressFamily::V4) else {
                    warn!(
                        hostname = %hostname,
                        endpoint = %endpoint,
                        "no last-known IPv4 address, delete deferred"
                    );
                    deleted = false;
                    continue;
                };

                let op = DnsOp {
                    provider: provider.clone(),
                    action: DnsAction::Delete,
                    domain: parts.registrable(),
                    name: parts.subdomain.clone(),
                    rtype: RecordType::A,
                    content: addr.to_string(),
                };
                if !self.execute(&op).await {
                    deleted = false;
                }
            }

            if deleted {
                self.store.remove(hostname);
                debug!(hostname = %hostname, "record removed from running config");
            } else {
                // Keep the record so the next sweep retries the delete.
                has_error = true;
            }
        }

        has_error
    }

    /// Expire stale records and hand them to the delete path
    ///
    /// Run once per cycle after [`Reconciler::apply`].
    pub async fn sweep(&mut self) -> SweepOutcome {
        let expired = expiry::collect_expired(&self.store, &self.settings, Utc::now());
        if expired.is_empty() {
            return SweepOutcome::default();
        }

        let errors = self.delete_records(&expired).await;
        SweepOutcome { expired, errors }
    }

    /// Publish every endpoint address of a newly created record
    ///
    /// Returns whether all creates succeeded; individual failures are
    /// logged and do not abort the remaining endpoints.
    async fn publish(&self, provider: &str, parts: &DomainParts, record: &DesiredRecord) -> bool {
        let mut ok = true;

        for endpoint in &record.endpoints {
            let Some(addresses) = self.endpoints.addresses(endpoint) else {
                warn!(
                    hostname = %record.hostname,
                    endpoint = %endpoint,
                    "endpoint not in discovery table"
                );
                ok = false;
                continue;
            };

            for (family, addr) in addresses {
                let op = DnsOp {
                    provider: provider.to_string(),
                    action: DnsAction::Create,
                    domain: parts.registrable(),
                    name: parts.subdomain.clone(),
                    rtype: family.record_type(),
                    content: addr.to_string(),
                };
                if !self.execute(&op).await {
                    ok = false;
                }
            }
        }

        ok
    }

    /// Provider for a record: explicit override, else first resolver
    /// candidate
    async fn resolve_provider(&self, hostname: &str, override_: Option<&str>) -> Result<String> {
        if let Some(provider) = override_ {
            return Ok(provider.to_string());
        }

        self.resolver
            .candidates(hostname)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::resolver(format!("no provider candidate for {hostname}")))
    }

    /// Run one provider call under the configured timeout
    ///
    /// Returns whether the call succeeded; every failure mode (rejection,
    /// error, timeout) is logged with provider, action, and target.
    async fn execute(&self, op: &DnsOp) -> bool {
        match tokio::time::timeout(self.settings.call_timeout(), self.executor.execute(op)).await {
            Ok(Ok(true)) => {
                info!("{}", op);
                true
            }
            Ok(Ok(false)) => {
                error!("{} rejected by provider", op);
                false
            }
            Ok(Err(e)) => {
                error!("{} failed: {}", op, e);
                false
            }
            Err(_) => {
                error!(
                    "{} timed out after {:?}",
                    op,
                    self.settings.call_timeout()
                );
                false
            }
        }
    }
}
