//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the checker.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::health::endpoint::{Endpoint, EndpointContext, SourceLabel};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CheckerConfig {
    /// Seconds to wait after startup before adjusters begin checking.
    pub start_delay_secs: u64,

    /// Default health check settings for every endpoint.
    pub health_check: HealthCheckConfig,

    /// Endpoints to monitor.
    pub endpoints: Vec<EndpointConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Health check settings.
///
/// Parameters mirror those of a cloud load balancer health check.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// HTTP route to probe.
    pub route: String,

    /// Seconds between checks.
    pub interval_secs: u64,

    /// Seconds before a check attempt times out.
    pub timeout_secs: f64,

    /// Consecutive failures before the endpoint is marked unhealthy.
    pub unhealthy_threshold: u32,

    /// Consecutive successes before the endpoint is marked healthy.
    pub healthy_threshold: u32,

    /// Optional named port to probe, looked up in the endpoint's port map.
    pub port_name: Option<String>,

    /// HTTP verb, GET or HEAD.
    pub http_method: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            route: "/health".to_string(),
            interval_secs: 5,
            timeout_secs: 3.0,
            unhealthy_threshold: 2,
            healthy_threshold: 2,
            port_name: None,
            http_method: "GET".to_string(),
        }
    }
}

/// Per-endpoint overrides of the default health check settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HealthCheckOverride {
    pub route: Option<String>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<f64>,
    pub unhealthy_threshold: Option<u32>,
    pub healthy_threshold: Option<u32>,
    pub port_name: Option<String>,
    pub http_method: Option<String>,
}

impl HealthCheckOverride {
    /// Apply the set fields on top of `base`.
    pub fn apply(&self, base: &HealthCheckConfig) -> HealthCheckConfig {
        HealthCheckConfig {
            route: self.route.clone().unwrap_or_else(|| base.route.clone()),
            interval_secs: self.interval_secs.unwrap_or(base.interval_secs),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            unhealthy_threshold: self.unhealthy_threshold.unwrap_or(base.unhealthy_threshold),
            healthy_threshold: self.healthy_threshold.unwrap_or(base.healthy_threshold),
            port_name: self.port_name.clone().or_else(|| base.port_name.clone()),
            http_method: self.http_method.clone().unwrap_or_else(|| base.http_method.clone()),
        }
    }
}

/// One monitored endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,

    /// Source label for logs and metrics.
    #[serde(default)]
    pub source: Option<String>,

    /// Job coordinates; derive `source` when it is not set explicitly.
    #[serde(default)]
    pub job: Option<SourceLabel>,

    /// Named ports (e.g. `health = 8081`).
    #[serde(default)]
    pub port_map: HashMap<String, u16>,

    /// Overrides of the default health check settings.
    #[serde(default)]
    pub health_check: HealthCheckOverride,
}

impl EndpointConfig {
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port).with_context(EndpointContext {
            port_map: self.port_map.clone(),
            source: self.source_label(),
            extra: HashMap::new(),
        })
    }

    /// Explicit `source`, else the label derived from `job`.
    pub fn source_label(&self) -> Option<String> {
        self.source
            .clone()
            .or_else(|| self.job.as_ref().and_then(SourceLabel::render))
    }

    /// Effective health check settings for this endpoint.
    pub fn health_check(&self, defaults: &HealthCheckConfig) -> HealthCheckConfig {
        self.health_check.apply(defaults)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HealthCheckConfig::default();
        assert_eq!(config.route, "/health");
        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.timeout_secs, 3.0);
        assert_eq!(config.unhealthy_threshold, 2);
        assert_eq!(config.healthy_threshold, 2);
        assert_eq!(config.port_name, None);
        assert_eq!(config.http_method, "GET");
    }

    #[test]
    fn test_minimal_toml() {
        let config: CheckerConfig = toml::from_str(
            r#"
            [[endpoints]]
            host = "10.0.0.5"
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.start_delay_secs, 0);
        assert_eq!(config.health_check, HealthCheckConfig::default());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_override_applies_set_fields_only() {
        let endpoint: EndpointConfig = toml::from_str(
            r#"
            host = "a"
            port = 1
            source = "west.www.prod.api.0"
            port_map = { health = 2 }
            health_check = { route = "/ready", healthy_threshold = 5 }
            "#,
        )
        .unwrap();

        let effective = endpoint.health_check(&HealthCheckConfig::default());
        assert_eq!(effective.route, "/ready");
        assert_eq!(effective.healthy_threshold, 5);
        assert_eq!(effective.unhealthy_threshold, 2);
        assert_eq!(effective.interval_secs, 5);

        let ep = endpoint.to_endpoint();
        assert_eq!(ep.source(), "west.www.prod.api.0");
        assert_eq!(ep.resolve_port(Some("health")), 2);
    }

    #[test]
    fn test_source_derived_from_job() {
        let endpoint: EndpointConfig = toml::from_str(
            r#"
            host = "a"
            port = 1
            job = { cluster = "west", role = "www", environment = "prod", job = "api", shard = 4 }
            "#,
        )
        .unwrap();
        assert_eq!(endpoint.to_endpoint().source(), "west.www.prod.api.4");

        let explicit = EndpointConfig {
            source: Some("custom".into()),
            ..endpoint.clone()
        };
        assert_eq!(explicit.to_endpoint().source(), "custom");

        let incomplete = EndpointConfig {
            job: Some(SourceLabel {
                cluster: "west".into(),
                ..Default::default()
            }),
            ..endpoint
        };
        assert_eq!(incomplete.source_label(), None);
        assert_eq!(incomplete.to_endpoint().source(), "");
    }
}
