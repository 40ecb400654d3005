//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define health-check metrics behind an injectable sink
//! - Install the process-wide Prometheus recorder
//!
//! # Metrics
//! - `health_share_healthy_total` (counter): successful checks by source
//! - `health_share_unhealthy_total` (counter): failed checks by source, type, status_code
//! - `health_share_updated_health_status_total` (counter): status transitions by source
//! - `health_share_running_callback_total` (counter): update callback failures by type
//! - `health_share_share` (gauge): current share multiplier by source
//!
//! # Design Decisions
//! - Adjusters hold an `Arc<dyn TelemetrySink>` so tests run without a recorder
//! - `MetricsSink` forwards to the `metrics` facade; without an installed
//!   recorder the calls are no-ops

use std::net::SocketAddr;

use dashmap::DashMap;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::result::CheckResultKind;

pub const HEALTHY: &str = "health_share_healthy_total";
pub const UNHEALTHY: &str = "health_share_unhealthy_total";
pub const UPDATED_HEALTH_STATUS: &str = "health_share_updated_health_status_total";
pub const RUNNING_CALLBACK: &str = "health_share_running_callback_total";
pub const SHARE: &str = "health_share_share";

/// Where adjusters report check outcomes.
pub trait TelemetrySink: Send + Sync {
    fn healthy(&self, source: &str);
    fn unhealthy(&self, source: &str, kind: CheckResultKind, status_code: Option<u16>);
    fn status_updated(&self, source: &str);
    fn callback_failed(&self, kind: &str);
    fn share(&self, source: &str, value: f64);
}

/// Sink backed by the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSink;

impl TelemetrySink for MetricsSink {
    fn healthy(&self, source: &str) {
        metrics::counter!(HEALTHY, "source" => source.to_string()).increment(1);
    }

    fn unhealthy(&self, source: &str, kind: CheckResultKind, status_code: Option<u16>) {
        let status_code = status_code.map(|c| c.to_string()).unwrap_or_default();
        metrics::counter!(
            UNHEALTHY,
            "source" => source.to_string(),
            "type" => kind.as_str(),
            "status_code" => status_code
        )
        .increment(1);
    }

    fn status_updated(&self, source: &str) {
        metrics::counter!(UPDATED_HEALTH_STATUS, "source" => source.to_string()).increment(1);
    }

    fn callback_failed(&self, kind: &str) {
        metrics::counter!(RUNNING_CALLBACK, "type" => kind.to_string()).increment(1);
    }

    fn share(&self, source: &str, value: f64) {
        metrics::gauge!(SHARE, "source" => source.to_string()).set(value);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn healthy(&self, _source: &str) {}
    fn unhealthy(&self, _source: &str, _kind: CheckResultKind, _status_code: Option<u16>) {}
    fn status_updated(&self, _source: &str) {}
    fn callback_failed(&self, _kind: &str) {}
    fn share(&self, _source: &str, _value: f64) {}
}

/// In-memory sink keyed by metric name and labels.
///
/// Keys render as `name{label=value,...}` with labels in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    counters: DashMap<String, u64>,
    gauges: DashMap<String, f64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value, zero if never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .get(&metric_key(name, labels))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum of every series of a counter regardless of labels.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| series_name(entry.key()) == name)
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges.get(&metric_key(name, labels)).map(|v| *v)
    }

    fn incr(&self, name: &str, labels: &[(&str, &str)]) {
        *self.counters.entry(metric_key(name, labels)).or_insert(0) += 1;
    }
}

impl TelemetrySink for MemorySink {
    fn healthy(&self, source: &str) {
        self.incr(HEALTHY, &[("source", source)]);
    }

    fn unhealthy(&self, source: &str, kind: CheckResultKind, status_code: Option<u16>) {
        let status_code = status_code.map(|c| c.to_string()).unwrap_or_default();
        self.incr(
            UNHEALTHY,
            &[("source", source), ("type", kind.as_str()), ("status_code", &status_code)],
        );
    }

    fn status_updated(&self, source: &str) {
        self.incr(UPDATED_HEALTH_STATUS, &[("source", source)]);
    }

    fn callback_failed(&self, kind: &str) {
        self.incr(RUNNING_CALLBACK, &[("type", kind)]);
    }

    fn share(&self, source: &str, value: f64) {
        self.gauges.insert(metric_key(SHARE, &[("source", source)]), value);
    }
}

fn metric_key(name: &str, labels: &[(&str, &str)]) -> String {
    let labels: Vec<String> = labels.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}{{{}}}", name, labels.join(","))
}

fn series_name(key: &str) -> &str {
    key.split('{').next().unwrap_or(key)
}

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(HEALTHY, "Total healthy checks");
    metrics::describe_counter!(UNHEALTHY, "Total unhealthy checks");
    metrics::describe_counter!(UPDATED_HEALTH_STATUS, "Total health status transitions");
    metrics::describe_counter!(RUNNING_CALLBACK, "Total update callback failures");
    metrics::describe_gauge!(SHARE, "Current share multiplier");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
