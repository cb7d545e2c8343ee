//! Public-suffix-aware hostname decomposition
//!
//! Provider APIs address records as `(domain, name)` where `domain` is the
//! registrable domain and `name` the remaining subdomain labels. Splitting
//! on the last two dots is wrong for multi-label public suffixes
//! (`co.uk`), so the split goes through the public-suffix list.

use crate::error::{Error, Result};

/// Decomposed hostname: `subdomain` + `domain` + `suffix`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParts {
    /// Labels left of the registrable domain; empty at the apex
    pub subdomain: String,

    /// Registrable label (e.g. `example` in `example.co.uk`)
    pub domain: String,

    /// Public suffix (e.g. `com`, `co.uk`)
    pub suffix: String,
}

impl DomainParts {
    /// Registrable domain, i.e. `domain.suffix`
    pub fn registrable(&self) -> String {
        format!("{}.{}", self.domain, self.suffix)
    }
}

/// Split a hostname into subdomain, registrable label, and public suffix
///
/// The hostname is lowercased and a trailing dot is ignored. Hostnames
/// without a known suffix or without a registrable label (e.g. a bare TLD)
/// are rejected.
pub fn split_hostname(hostname: &str) -> Result<DomainParts> {
    let normalized = hostname.trim_end_matches('.').to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(Error::domain("empty hostname"));
    }

    let registrable = psl::domain_str(&normalized)
        .ok_or_else(|| Error::domain(format!("no registrable domain in {hostname:?}")))?;
    let suffix = psl::suffix_str(&normalized)
        .ok_or_else(|| Error::domain(format!("no public suffix in {hostname:?}")))?;

    let domain = registrable
        .strip_suffix(suffix)
        .and_then(|d| d.strip_suffix('.'))
        .ok_or_else(|| Error::domain(format!("malformed registrable domain in {hostname:?}")))?;

    let subdomain = normalized
        .strip_suffix(registrable)
        .map(|s| s.trim_end_matches('.'))
        .unwrap_or_default();

    Ok(DomainParts {
        subdomain: subdomain.to_string(),
        domain: domain.to_string(),
        suffix: suffix.to_string(),
    })
}
