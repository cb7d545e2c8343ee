//! Test doubles and common utilities for reconciler contract tests
//!
//! The mocks record calls into `Arc`'d state so a test can keep a handle
//! that shares counters with the instance handed to the reconciler.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use nsherd_core::error::{Error, Result};
use nsherd_core::record::{DesiredBatch, DesiredRecord, SourceRef};
use nsherd_core::traits::discovery::EndpointDiscovery;
use nsherd_core::traits::executor::{DnsAction, DnsExecutor, DnsOp};
use nsherd_core::traits::resolver::ProviderResolver;
use nsherd_core::traits::source::RecordSource;
use nsherd_core::{EndpointTable, Reconciler, Settings};

/// A DnsExecutor that records every operation and can be told to fail
pub struct MockExecutor {
    ops: Arc<Mutex<Vec<DnsOp>>>,
    failing: Arc<AtomicBool>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            ops: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new MockExecutor that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ops: Arc::clone(&other.ops),
            failing: Arc::clone(&other.failing),
        }
    }

    /// All operations executed so far
    pub fn ops(&self) -> Vec<DnsOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Operations of one action kind
    pub fn ops_of(&self, action: DnsAction) -> Vec<DnsOp> {
        self.ops()
            .into_iter()
            .filter(|op| op.action == action)
            .collect()
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DnsExecutor for MockExecutor {
    async fn execute(&self, op: &DnsOp) -> Result<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "injected failure"));
        }
        self.ops.lock().unwrap().push(op.clone());
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// A ProviderResolver that always returns the same candidates
pub struct StaticResolver {
    candidates: Vec<String>,
}

impl StaticResolver {
    pub fn new(candidates: &[&str]) -> Self {
        Self {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A resolver that cannot determine any provider
    pub fn empty() -> Self {
        Self::new(&[])
    }
}

#[async_trait::async_trait]
impl ProviderResolver for StaticResolver {
    async fn candidates(&self, _hostname: &str) -> Result<Vec<String>> {
        Ok(self.candidates.clone())
    }
}

/// An EndpointDiscovery that returns a fixed table, or fails on demand
pub struct MockDiscovery {
    table: EndpointTable,
    failing: Arc<AtomicBool>,
}

impl MockDiscovery {
    pub fn new(table: EndpointTable) -> Self {
        Self {
            table,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failing)
    }
}

#[async_trait::async_trait]
impl EndpointDiscovery for MockDiscovery {
    async fn discover(&self) -> Result<EndpointTable> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::discovery("injected discovery failure"));
        }
        Ok(self.table.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// A RecordSource that serves a scripted queue of pull results
///
/// Once the queue runs dry it keeps returning empty batches.
pub struct QueueSource {
    queue: Arc<Mutex<VecDeque<Result<DesiredBatch>>>>,
}

impl QueueSource {
    pub fn new(results: Vec<Result<DesiredBatch>>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(results.into())),
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for QueueSource {
    async fn pull(&self) -> Result<DesiredBatch> {
        match self.queue.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(DesiredBatch::new()),
        }
    }

    fn name(&self) -> &'static str {
        "queue"
    }
}

/// Settings with the built-in defaults (ttl 10, interval 10)
pub fn test_settings() -> Settings {
    Settings::default()
}

/// An endpoint table with `local` plus a public IPv4 address
pub fn public_table(addr: &str) -> EndpointTable {
    let mut table = EndpointTable::with_local();
    table.insert("public", addr.parse::<IpAddr>().unwrap());
    table
}

/// One desired record observed by a docker container
pub fn desired(hostname: &str, endpoints: &[&str], source_id: &str) -> DesiredRecord {
    DesiredRecord {
        hostname: hostname.to_string(),
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        sources: vec![SourceRef::new("docker", "container", source_id)],
        provider: None,
    }
}

/// A batch with a single desired record under key `r1`
pub fn batch_of(record: DesiredRecord) -> DesiredBatch {
    let mut batch = DesiredBatch::new();
    batch.insert("r1".to_string(), record);
    batch
}

/// A reconciler wired to the given mocks with a public IPv4 endpoint
pub fn reconciler_with(
    executor: &MockExecutor,
    resolver: StaticResolver,
    public_v4: &str,
) -> Reconciler {
    let mut reconciler = Reconciler::new(
        Box::new(MockExecutor::sharing_counters_with(executor)),
        Box::new(resolver),
        test_settings(),
    );
    reconciler.update_endpoints(public_table(public_v4));
    reconciler
}
