//! Adjuster supervision.
//!
//! # Responsibilities
//! - Create one adjuster per configured endpoint and start it
//! - Reconcile running adjusters against a reloaded configuration
//! - Forward status-change signals to a single receiver
//! - Stop everything on shutdown
//!
//! # Design Decisions
//! - Adjusters are keyed by `host:port`
//! - A changed endpoint or changed settings means stop the old adjuster and
//!   start a fresh one; history is never carried over
//! - All adjusters share one HTTP probe (and its connection pool)

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::schema::{CheckerConfig, EndpointConfig, HealthCheckConfig};
use crate::health::active::HttpHealthCheck;
use crate::health::probe::Probe;
use crate::health::settings::ConfigError;
use crate::health::state::HealthStatus;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics::TelemetrySink;
use crate::share::{AuditableShare, ShareAdjuster, SignalError, UpdateSignal};

/// Grace period for check tasks to exit on shutdown.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    adjuster: HttpHealthCheck,
    endpoint: EndpointConfig,
    settings: HealthCheckConfig,
    handle: JoinHandle<()>,
}

/// Outcome of applying a configuration.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileSummary {
    pub started: Vec<String>,
    pub stopped: Vec<String>,
    pub unchanged: usize,
    pub rejected: Vec<(String, ConfigError)>,
}

/// Current view of one endpoint for the routing layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointShare {
    pub endpoint: String,
    pub status: HealthStatus,
    pub share: AuditableShare,
}

/// Owns the running adjusters.
pub struct Supervisor {
    running: DashMap<String, Running>,
    probe: Arc<dyn Probe>,
    telemetry: Arc<dyn TelemetrySink>,
    update_tx: mpsc::UnboundedSender<()>,
}

impl Supervisor {
    /// Create a supervisor and the receiver for status-change notifications.
    pub fn new(
        probe: Arc<dyn Probe>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            running: DashMap::new(),
            probe,
            telemetry,
            update_tx,
        };
        (supervisor, update_rx)
    }

    fn signal(&self) -> UpdateSignal {
        let tx = self.update_tx.clone();
        Arc::new(move || tx.send(()).map_err(|_| SignalError::Closed))
    }

    /// Bring the running set in line with `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn apply(&self, config: &CheckerConfig) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let desired: Vec<(String, &EndpointConfig, HealthCheckConfig)> = config
            .endpoints
            .iter()
            .map(|ep| (format!("{}:{}", ep.host, ep.port), ep, ep.health_check(&config.health_check)))
            .collect();

        // Stop adjusters that vanished or changed.
        let stale: Vec<String> = self
            .running
            .iter()
            .filter(|entry| {
                !desired.iter().any(|(key, ep, settings)| {
                    key == entry.key()
                        && *ep == &entry.value().endpoint
                        && *settings == entry.value().settings
                })
            })
            .map(|entry| entry.key().clone())
            .collect();

        for key in stale {
            if let Some((_, running)) = self.running.remove(&key) {
                running.adjuster.stop();
                summary.stopped.push(key);
            }
        }

        for (key, endpoint, settings) in desired {
            if self.running.contains_key(&key) {
                summary.unchanged += 1;
                continue;
            }

            let built = HttpHealthCheck::builder(Arc::new(endpoint.to_endpoint()), settings.clone())
                .signal(self.signal())
                .probe(self.probe.clone())
                .telemetry(self.telemetry.clone())
                .build();

            match built {
                Ok(adjuster) => {
                    let handle = adjuster.start();
                    self.running.insert(
                        key.clone(),
                        Running {
                            adjuster,
                            endpoint: endpoint.clone(),
                            settings,
                            handle,
                        },
                    );
                    summary.started.push(key);
                }
                Err(e) => {
                    tracing::error!(endpoint = %key, error = %e, "Rejected health check configuration");
                    summary.rejected.push((key, e));
                }
            }
        }

        tracing::info!(
            started = summary.started.len(),
            stopped = summary.stopped.len(),
            unchanged = summary.unchanged,
            rejected = summary.rejected.len(),
            "Adjusters reconciled"
        );
        summary
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Shares of every running adjuster, sorted by endpoint.
    pub fn shares(&self) -> Vec<EndpointShare> {
        let mut shares: Vec<EndpointShare> = self
            .running
            .iter()
            .map(|entry| EndpointShare {
                endpoint: entry.key().clone(),
                status: entry.value().adjuster.status(),
                share: entry.value().adjuster.auditable_share(),
            })
            .collect();
        shares.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        shares
    }

    /// Stop every adjuster, abort in-flight probes and wait for the tasks.
    pub async fn shutdown(&self) {
        let keys: Vec<String> = self.running.iter().map(|entry| entry.key().clone()).collect();
        let mut handles = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, running)) = self.running.remove(&key) {
                running.adjuster.shutdown();
                handles.push((key, running.handle));
            }
        }

        for (key, handle) in handles {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(endpoint = %key, error = %e, "Health check task failed"),
                Err(_) => tracing::warn!(endpoint = %key, "Health check task did not exit in time"),
            }
        }
        tracing::info!("All health checkers stopped");
    }
}

/// Log the share table every time an adjuster reports a status change.
///
/// Runs until shutdown or until every sender is gone.
pub async fn report_shares(
    supervisor: Arc<Supervisor>,
    mut updates: mpsc::UnboundedReceiver<()>,
    shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                if update.is_none() {
                    break;
                }
                // Coalesce bursts into one recomputation.
                while updates.try_recv().is_ok() {}

                let shares = supervisor.shares();
                let healthy = shares.iter().filter(|s| s.share.share > 0.0).count();
                tracing::info!(healthy, total = shares.len(), "Endpoint shares updated");
                for entry in shares {
                    tracing::info!(
                        endpoint = %entry.endpoint,
                        status = %entry.status,
                        share = entry.share.share,
                        audit = %entry.share.audit,
                        "Endpoint share"
                    );
                }
            }
            _ = shutdown.wait() => break,
        }
    }
}
