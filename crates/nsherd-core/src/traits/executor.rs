// # DNS Executor Trait
//
// Defines the interface for executing a single record operation against a
// DNS provider API.
//
// Implementations wrap one provider client; the engine never talks to a
// provider API directly. Executors are expected to be idempotent: creating
// a record that already matches, or deleting one that is already gone,
// reports success.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// DNS record type published for an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::Aaaa => f.write_str("AAAA"),
        }
    }
}

/// Provider operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsAction {
    /// Publish a record
    Create,
    /// Remove a record
    Delete,
}

impl fmt::Display for DnsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// One provider call: `(provider, action, domain, name, type, content)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsOp {
    /// Provider the call is routed to (e.g. `cloudflare`)
    pub provider: String,

    /// Create or delete
    pub action: DnsAction,

    /// Registrable domain (e.g. `example.com`)
    pub domain: String,

    /// Subdomain labels relative to `domain`; empty for the apex
    pub name: String,

    /// Record type
    pub rtype: RecordType,

    /// Record content, i.e. the address string
    pub content: String,
}

impl DnsOp {
    /// Fully-qualified name the operation targets
    pub fn fqdn(&self) -> String {
        if self.name.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.name, self.domain)
        }
    }
}

impl fmt::Display for DnsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} {} -> {}",
            self.provider,
            self.action,
            self.rtype,
            self.fqdn(),
            self.content
        )
    }
}

/// Trait for DNS provider execution clients
///
/// Implementations perform exactly one API call per invocation and report
/// success or failure; retry, scheduling, and state decisions belong to the
/// reconciler.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsExecutor: Send + Sync {
    /// Execute one create/delete operation
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: the provider acknowledged the operation
    /// - `Ok(false)`: the provider rejected it (e.g. missing credentials)
    /// - `Err(Error)`: the call itself failed (network, auth, API error)
    async fn execute(&self, op: &DnsOp) -> Result<bool>;

    /// Short name of the execution backend, for logging
    fn name(&self) -> &'static str;
}

/// Executor that logs operations without touching any provider
///
/// The default wiring seam: real provider clients are deployment-specific,
/// so the daemon ships with this dry-run backend until one is plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl DnsExecutor for DryRunExecutor {
    async fn execute(&self, op: &DnsOp) -> Result<bool> {
        tracing::info!("dry-run: {}", op);
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
