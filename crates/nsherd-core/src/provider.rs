//! DNS provider auto-detection via authoritative nameservers
//!
//! When a record carries no provider override, the reconciler asks which
//! provider hosts the zone by resolving the registrable domain's NS
//! records and matching each nameserver's registrable label against a
//! static provider directory (`ns.cloudflare.com` -> `cloudflare`).
//!
//! Lookups are live network calls, so the resolver runs them under a short
//! timeout with one retry and fails soft to an empty candidate set.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::split_hostname;
use crate::error::{Error, Result};
use crate::traits::resolver::{NameserverLookup, ProviderResolver};

/// Per-attempt timeout for an NS lookup
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Lookup attempts before failing soft
const LOOKUP_ATTEMPTS: usize = 2;

/// Static directory mapping a nameserver's registrable label to a provider
///
/// Keys are the `domain` part of the nameserver hostname, e.g.
/// `ns.cloudflare.com` -> `cloudflare`.
const PROVIDER_DIRECTORY: &[(&str, &str)] = &[
    ("cloudflare", "cloudflare"),
    ("digitalocean", "digitalocean"),
    ("dnsimple", "dnsimple"),
    ("domaincontrol", "godaddy"),
    ("gandi", "gandi"),
    ("godaddy", "godaddy"),
    ("hetzner", "hetzner"),
    ("linode", "linode"),
    ("ovh", "ovh"),
    ("registrar-servers", "namecheap"),
];

/// Provider for the registrable label of a nameserver hostname
///
/// Route53 nameservers are numbered (`ns-123.awsdns-45.org`), so they
/// match by prefix rather than by directory entry.
pub fn provider_for_nameserver_label(label: &str) -> Option<&'static str> {
    if label.starts_with("awsdns-") {
        return Some("route53");
    }
    PROVIDER_DIRECTORY
        .iter()
        .find(|(key, _)| *key == label)
        .map(|(_, provider)| *provider)
}

/// NS-lookup-backed provider resolver
pub struct NsProviderResolver {
    lookup: Box<dyn NameserverLookup>,
}

impl NsProviderResolver {
    /// Create a resolver over the given nameserver lookup backend
    pub fn new(lookup: Box<dyn NameserverLookup>) -> Self {
        Self { lookup }
    }

    async fn lookup_with_retry(&self, domain: &str) -> Result<Vec<String>> {
        let mut last_err = None;
        for attempt in 1..=LOOKUP_ATTEMPTS {
            match tokio::time::timeout(LOOKUP_TIMEOUT, self.lookup.lookup(domain)).await {
                Ok(Ok(nameservers)) => return Ok(nameservers),
                Ok(Err(e)) => {
                    debug!(domain, attempt, error = %e, "NS lookup failed");
                    last_err = Some(e);
                }
                Err(_) => {
                    debug!(domain, attempt, "NS lookup timed out");
                    last_err = Some(Error::resolver(format!("NS lookup for {domain} timed out")));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::resolver("NS lookup failed")))
    }
}

#[async_trait]
impl ProviderResolver for NsProviderResolver {
    async fn candidates(&self, hostname: &str) -> Result<Vec<String>> {
        let registrable = match split_hostname(hostname) {
            Ok(parts) => parts.registrable(),
            Err(e) => {
                warn!(hostname, error = %e, "cannot decompose hostname for provider detection");
                return Ok(Vec::new());
            }
        };

        let nameservers = match self.lookup_with_retry(&registrable).await {
            Ok(ns) => ns,
            Err(e) => {
                warn!(domain = %registrable, error = %e, "provider auto-detection failed");
                return Ok(Vec::new());
            }
        };

        // Deduplicated, order-stable over the lookup result
        let mut candidates: Vec<String> = Vec::new();
        for nameserver in &nameservers {
            let label = match split_hostname(nameserver) {
                Ok(parts) => parts.domain,
                Err(_) => continue,
            };
            if let Some(provider) = provider_for_nameserver_label(&label) {
                if !candidates.iter().any(|c| c == provider) {
                    candidates.push(provider.to_string());
                }
            }
        }

        if candidates.is_empty() {
            debug!(domain = %registrable, ?nameservers, "no known provider for nameservers");
        }
        Ok(candidates)
    }
}

/// Live NS lookup over the system resolver configuration
pub struct SystemNameserverLookup {
    resolver: hickory_resolver::TokioAsyncResolver,
}

impl SystemNameserverLookup {
    /// Create a lookup backend from the system resolver configuration
    pub fn from_system_conf() -> Result<Self> {
        let resolver = hickory_resolver::TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| Error::resolver(format!("cannot build system resolver: {e}")))?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl NameserverLookup for SystemNameserverLookup {
    async fn lookup(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = self
            .resolver
            .ns_lookup(domain)
            .await
            .map_err(|e| Error::resolver(format!("NS lookup for {domain} failed: {e}")))?;

        Ok(lookup
            .iter()
            .map(|ns| ns.0.to_utf8().trim_end_matches('.').to_string())
            .collect())
    }
}
