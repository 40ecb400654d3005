//! Active HTTP health checking for a single endpoint.
//!
//! # Responsibilities
//! - Periodically probe one endpoint
//! - Feed classified results to the evaluator
//! - Notify the proxy when the endpoint's status flips
//!
//! # Design Decisions
//! - One task per endpoint; probes for the same endpoint never overlap
//! - Fixed interval regardless of outcome (no backoff)
//! - Status is published as an immutable snapshot so readers never lock
//! - Update callback failures are logged and counted, never propagated

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::HealthCheckConfig;
use crate::health::endpoint::Endpoint;
use crate::health::probe::{HttpProbe, Probe, ProbeRequest};
use crate::health::result::{classify, CheckResultKind, Classification, Disposition, ProbeOutcome};
use crate::health::settings::{CheckSettings, ConfigError};
use crate::health::state::{Evaluator, HealthStatus, Transition};
use crate::observability::metrics::{MetricsSink, TelemetrySink};
use crate::share::{AuditItem, AuditableShare, ShareAdjuster, SignalError, UpdateSignal};

/// Point-in-time view of an adjuster's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    /// Window contents, oldest first.
    pub history: Vec<CheckResultKind>,
}

/// Builder for [`HttpHealthCheck`].
pub struct HealthCheckBuilder {
    endpoint: Arc<Endpoint>,
    config: HealthCheckConfig,
    signal: Option<UpdateSignal>,
    probe: Option<Arc<dyn Probe>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl HealthCheckBuilder {
    /// Callback invoked on every status transition.
    pub fn signal(mut self, signal: UpdateSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Replace the default HTTP probe.
    pub fn probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Replace the default `metrics`-backed sink.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Validate settings and create the adjuster. Nothing is scheduled.
    pub fn build(self) -> Result<HttpHealthCheck, ConfigError> {
        let settings = CheckSettings::try_from(&self.config)?;
        let check_uri = build_check_uri(&self.endpoint, &settings);
        let evaluator = Evaluator::new(settings.healthy_threshold, settings.unhealthy_threshold);
        let snapshot = HealthSnapshot {
            status: evaluator.status(),
            history: Vec::new(),
        };

        let inner = Inner {
            endpoint: self.endpoint,
            settings,
            check_uri,
            probe: self.probe.unwrap_or_else(|| Arc::new(HttpProbe::new())),
            telemetry: self.telemetry.unwrap_or_else(|| Arc::new(MetricsSink)),
            signal: self.signal,
            evaluator: Mutex::new(evaluator),
            snapshot: ArcSwap::from_pointee(snapshot),
            stopped: AtomicBool::new(false),
            wake: CancellationToken::new(),
            abort: CancellationToken::new(),
        };

        Ok(HttpHealthCheck {
            inner: Arc::new(inner),
        })
    }
}

/// HTTP health check share adjuster.
///
/// Checks for a 200 response. Cloning yields another handle to the same
/// adjuster.
#[derive(Clone)]
pub struct HttpHealthCheck {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: Arc<Endpoint>,
    settings: CheckSettings,
    check_uri: String,
    probe: Arc<dyn Probe>,
    telemetry: Arc<dyn TelemetrySink>,
    signal: Option<UpdateSignal>,
    /// Written only by the check task.
    evaluator: Mutex<Evaluator>,
    snapshot: ArcSwap<HealthSnapshot>,
    stopped: AtomicBool,
    /// Cancelled by `stop` to cut the inter-check sleep short.
    wake: CancellationToken,
    /// Cancelled by `shutdown` to drop an in-flight probe.
    abort: CancellationToken,
}

impl HttpHealthCheck {
    pub fn builder(endpoint: Arc<Endpoint>, config: HealthCheckConfig) -> HealthCheckBuilder {
        HealthCheckBuilder {
            endpoint,
            config,
            signal: None,
            probe: None,
            telemetry: None,
        }
    }

    /// Create an adjuster with the default HTTP probe and metrics sink.
    pub fn new(
        endpoint: Arc<Endpoint>,
        signal: Option<UpdateSignal>,
        config: HealthCheckConfig,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::builder(endpoint, config);
        builder.signal = signal;
        builder.build()
    }

    pub fn settings(&self) -> &CheckSettings {
        &self.inner.settings
    }

    /// URI probed on every check.
    pub fn check_uri(&self) -> &str {
        &self.inner.check_uri
    }

    /// Consistent copy of status and window.
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot::clone(&self.inner.snapshot.load())
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stop and additionally drop any probe currently in flight.
    pub fn shutdown(&self) {
        self.stop();
        self.inner.abort.cancel();
    }

    /// Run one check now.
    ///
    /// Returns `None` without probing if the adjuster is stopped, or if the
    /// probe was aborted by `shutdown`.
    pub async fn check_once(&self) -> Option<Classification> {
        self.inner.check_once().await
    }
}

impl ShareAdjuster for HttpHealthCheck {
    fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    fn start(&self) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tracing::info!(
            event = "started_checker",
            result = "success",
            source = inner.endpoint.source(),
            check_uri = %inner.check_uri,
            interval = ?inner.settings.interval,
            "Health checker started"
        );
        inner.telemetry.share(inner.endpoint.source(), share_for(self.status()));
        tokio::spawn(async move { inner.run().await })
    }

    fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.wake.cancel();
        tracing::info!(
            event = "stopped_checker",
            result = "success",
            source = self.inner.endpoint.source(),
            check_uri = %self.inner.check_uri,
            "Health checker stopped"
        );
    }

    fn status(&self) -> HealthStatus {
        self.inner.snapshot.load().status
    }

    fn auditable_share(&self) -> AuditableShare {
        let share = share_for(self.status());
        AuditableShare {
            share,
            audit: AuditItem::new("health", format!("{:.1}", share)),
        }
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = time::sleep(self.settings.interval) => {}
                _ = self.wake.cancelled() => {}
            }
            if self.check_once().await.is_none() {
                break;
            }
        }
        tracing::debug!(check_uri = %self.check_uri, "Health check loop exited");
    }

    async fn check_once(&self) -> Option<Classification> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }

        let source = self.endpoint.source();
        tracing::debug!(
            event = "starting_check",
            result = "success",
            source,
            check_uri = %self.check_uri,
            "Starting health check"
        );

        let request = ProbeRequest {
            uri: self.check_uri.clone(),
            method: self.settings.http_method,
            timeout: self.settings.timeout,
        };

        let outcome = tokio::select! {
            outcome = self.probe.probe(&request) => outcome,
            _ = self.abort.cancelled() => {
                tracing::debug!(check_uri = %self.check_uri, "Health check aborted");
                return None;
            }
        };

        let classification = classify(&outcome);
        self.record_check(source, &outcome, classification);

        if let Some(transition) = self.update_status(classification.kind) {
            self.on_transition(source, transition);
        }

        Some(classification)
    }

    fn record_check(&self, source: &str, outcome: &ProbeOutcome, classification: Classification) {
        let kind = classification.kind;
        let check_uri = &self.check_uri;

        match kind.disposition() {
            Disposition::Healthy => {
                self.telemetry.healthy(source);
                tracing::debug!(
                    event = "running_check",
                    result = "success",
                    source,
                    check_uri = %check_uri,
                    "Health check passed"
                );
            }
            Disposition::Unhealthy => {
                self.telemetry.unhealthy(source, kind, classification.status_code);
                match outcome {
                    Ok(status) => tracing::error!(
                        event = "running_check",
                        result = "failure",
                        source,
                        check_uri = %check_uri,
                        status_code = *status,
                        "Health check failed: non-200 status"
                    ),
                    Err(e) => tracing::error!(
                        event = "running_check",
                        result = log_result(kind),
                        source,
                        check_uri = %check_uri,
                        kind = %kind,
                        error = %e,
                        "Health check failed"
                    ),
                }
            }
            Disposition::Unchanged => {
                let error = outcome.as_ref().err().map(ToString::to_string).unwrap_or_default();
                tracing::warn!(
                    event = "running_check",
                    result = "error",
                    source,
                    check_uri = %check_uri,
                    kind = %kind,
                    error = %error,
                    "Health check hit a local failure, status unchanged"
                );
            }
        }
    }

    /// Fold the result and publish the new snapshot.
    fn update_status(&self, kind: CheckResultKind) -> Option<Transition> {
        if kind.disposition() == Disposition::Unchanged {
            return None;
        }

        let mut evaluator = self.evaluator.lock().unwrap_or_else(PoisonError::into_inner);
        let transition = evaluator.fold(kind);
        self.snapshot.store(Arc::new(HealthSnapshot {
            status: evaluator.status(),
            history: evaluator.history().snapshot(),
        }));
        transition
    }

    fn on_transition(&self, source: &str, transition: Transition) {
        self.telemetry.status_updated(source);
        self.telemetry.share(source, share_for(transition.to));
        tracing::info!(
            event = "updated_health_status",
            result = "success",
            source,
            check_uri = %self.check_uri,
            from = %transition.from,
            to = %transition.to,
            "{} -> {}",
            transition.from,
            transition.to
        );

        let Some(signal) = &self.signal else {
            return;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| signal()))
            .unwrap_or_else(|payload| Err(SignalError::Panicked(panic_message(payload))));

        if let Err(e) = result {
            self.telemetry.callback_failed(e.kind());
            tracing::error!(
                event = "running_callback",
                result = "error",
                source,
                check_uri = %self.check_uri,
                error = %e,
                "Update callback failed on health status change"
            );
        }
    }
}

/// `http://{host}:{port}{route}`, port resolved through the port map.
fn build_check_uri(endpoint: &Endpoint, settings: &CheckSettings) -> String {
    let port = endpoint.resolve_port(settings.port_name.as_deref());
    format!("http://{}:{}{}", endpoint.host, port, settings.route)
}

fn share_for(status: HealthStatus) -> f64 {
    if status.receives_traffic() {
        1.0
    } else {
        0.0
    }
}

fn log_result(kind: CheckResultKind) -> &'static str {
    match kind {
        CheckResultKind::Timeout => "timeout",
        _ => "error",
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
