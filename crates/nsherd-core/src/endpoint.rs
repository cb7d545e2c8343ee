//! The endpoint table: named network locations and their addresses
//!
//! Endpoint discovery produces a fresh table every reconciliation cycle;
//! the reconciler keeps the most recent one so the delete path can use an
//! endpoint's last-known address even after discovery starts failing.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::traits::executor::RecordType;

/// IP address family of a published address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl AddressFamily {
    /// Family of a concrete address
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// DNS record type published for this family
    pub fn record_type(self) -> RecordType {
        match self {
            Self::V4 => RecordType::A,
            Self::V6 => RecordType::Aaaa,
        }
    }
}

/// Mapping from endpoint name to one address per family
///
/// Iteration order is stable (sorted by endpoint name, then family), which
/// keeps provider call order deterministic across cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTable {
    entries: BTreeMap<String, BTreeMap<AddressFamily, IpAddr>>,
}

impl EndpointTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding only the `local` loopback endpoint
    ///
    /// Every discovery implementation must include this entry; it is the
    /// baseline a table degrades to when all lookups fail.
    pub fn with_local() -> Self {
        let mut table = Self::new();
        table.insert("local", IpAddr::V4(Ipv4Addr::LOCALHOST));
        table.insert("local", IpAddr::V6(Ipv6Addr::LOCALHOST));
        table
    }

    /// Set the address for an endpoint; the family is derived from the
    /// address and any previous address of that family is replaced
    pub fn insert(&mut self, endpoint: impl Into<String>, addr: IpAddr) {
        self.entries
            .entry(endpoint.into())
            .or_default()
            .insert(AddressFamily::of(&addr), addr);
    }

    /// Address of an endpoint for a specific family
    pub fn address(&self, endpoint: &str, family: AddressFamily) -> Option<IpAddr> {
        self.entries.get(endpoint)?.get(&family).copied()
    }

    /// All addresses of an endpoint, keyed by family
    pub fn addresses(&self, endpoint: &str) -> Option<&BTreeMap<AddressFamily, IpAddr>> {
        self.entries.get(endpoint)
    }

    /// Whether an endpoint is known
    pub fn contains(&self, endpoint: &str) -> bool {
        self.entries.contains_key(endpoint)
    }

    /// Known endpoint names in stable order
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of known endpoints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
