//! The polling engine: discovery -> pull -> apply -> sweep -> sleep
//!
//! One reconciliation cycle runs to completion before the loop sleeps for
//! `update_interval` seconds; nothing inside a cycle runs concurrently
//! with another cycle, which is what lets the record store go lock-free.
//!
//! ## Event Flow
//!
//! 1. Discover endpoints (failure: keep the previous table)
//! 2. Pull desired records (failure: treat the batch as empty)
//! 3. `Reconciler::apply` converges store + provider state
//! 4. `Reconciler::sweep` expires stale records
//! 5. Emit a cycle event and sleep
//!
//! Per-cycle errors never terminate the loop; only startup configuration
//! errors are fatal.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::record::{BootstrapRecord, DesiredBatch, Record};
use crate::reconciler::Reconciler;
use crate::traits::discovery::EndpointDiscovery;
use crate::traits::source::RecordSource;

/// Capacity of the engine event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the engine for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        /// Number of bootstrap records seeded
        bootstrap_records: usize,
    },

    /// A record passed its TTL and was handed to the delete path
    RecordExpired {
        /// Hostname of the expired record
        hostname: String,
    },

    /// One full reconciliation cycle finished
    CycleCompleted {
        /// Records created this cycle
        created: usize,
        /// Records refreshed this cycle
        refreshed: usize,
        /// Records replaced this cycle
        replaced: usize,
        /// Records expired this cycle
        expired: usize,
        /// Whether any provider operation failed
        errors: bool,
    },

    /// Engine stopped
    Stopped {
        /// Why the engine stopped
        reason: String,
    },
}

/// Summary of one reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Records created this cycle
    pub created: usize,
    /// Records refreshed this cycle
    pub refreshed: usize,
    /// Records replaced this cycle
    pub replaced: usize,
    /// Records expired this cycle
    pub expired: usize,
    /// Whether any provider operation failed
    pub errors: bool,
}

/// The reconciliation loop
pub struct Engine {
    discovery: Box<dyn EndpointDiscovery>,
    source: Box<dyn RecordSource>,
    reconciler: Reconciler,
    settings: Settings,
    bootstrap_count: usize,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Engine {
    /// Create an engine and seed any bootstrap records
    ///
    /// Bootstrap records are inserted into the store with a TTL of zero
    /// (exempt from expiry) and without provider calls; they are published
    /// like any other record once their endpoints resolve.
    ///
    /// # Returns
    ///
    /// The engine plus a receiver for [`EngineEvent`]s.
    pub fn new(
        discovery: Box<dyn EndpointDiscovery>,
        source: Box<dyn RecordSource>,
        mut reconciler: Reconciler,
        settings: Settings,
        bootstrap: Vec<BootstrapRecord>,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let bootstrap_count = bootstrap.len();
        for record in bootstrap {
            debug!(hostname = %record.hostname, "seeding bootstrap record");
            reconciler
                .store_mut()
                .insert(Record::bootstrap(record.hostname, record.endpoints));
        }

        let engine = Self {
            discovery,
            source,
            reconciler,
            settings,
            bootstrap_count,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// The reconciler (read access, for inspection)
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run the engine until SIGINT
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine with an explicit shutdown signal
    ///
    /// **TESTING ONLY**: deterministic shutdown for contract tests.
    /// Production code should use [`Engine::run`], which terminates on OS
    /// signals.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit(EngineEvent::Started {
            bootstrap_records: self.bootstrap_count,
        });
        info!(
            update_interval = self.settings.update_interval,
            "engine started"
        );

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                self.run_cycle().await;

                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval()) => {}
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                self.run_cycle().await;

                debug!("sleeping for {}s", self.settings.update_interval);
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval()) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run one reconciliation cycle
    ///
    /// Public so embedding code and tests can drive cycles without the
    /// sleep loop.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        match self.discovery.discover().await {
            Ok(table) => self.reconciler.update_endpoints(table),
            Err(e) => {
                error!(
                    backend = self.discovery.name(),
                    error = %e,
                    "endpoint discovery failed, reusing previous table"
                );
            }
        }

        let desired = match self.source.pull().await {
            Ok(batch) => batch,
            Err(e) => {
                error!(
                    source = self.source.name(),
                    error = %e,
                    "desired-state pull failed, treating batch as empty"
                );
                DesiredBatch::new()
            }
        };

        let outcome = self.reconciler.apply(&desired).await;
        let sweep = self.reconciler.sweep().await;

        for hostname in &sweep.expired {
            self.emit(EngineEvent::RecordExpired {
                hostname: hostname.clone(),
            });
        }

        let summary = CycleSummary {
            created: outcome.created,
            refreshed: outcome.refreshed,
            replaced: outcome.replaced,
            expired: sweep.expired.len(),
            errors: outcome.errors || sweep.errors,
        };

        self.emit(EngineEvent::CycleCompleted {
            created: summary.created,
            refreshed: summary.refreshed,
            replaced: summary.replaced,
            expired: summary.expired,
            errors: summary.errors,
        });

        if summary.errors {
            warn!(?summary, "cycle completed with errors");
        } else {
            debug!(?summary, "cycle completed");
        }

        summary
    }

    fn emit(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping engine event");
        }
    }
}
