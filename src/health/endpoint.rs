//! Endpoint descriptors.
//!
//! # Responsibilities
//! - Identify a backend by host and port
//! - Resolve named ports through the endpoint's port map
//! - Carry the `source` label used for log and metric attribution
//!
//! # Design Decisions
//! - Endpoints are owned by the proxy and shared with adjusters via `Arc`
//! - Free-form context values are kept as `serde_json::Value`

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque per-endpoint context supplied by the service-discovery source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointContext {
    /// Named ports (e.g. `health` -> 8081).
    pub port_map: HashMap<String, u16>,

    /// Label used to attribute logs and metrics to a job/shard.
    pub source: Option<String>,

    /// Anything else the discovery layer attached.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A backend network target.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub context: EndpointContext,
}

impl Endpoint {
    /// Create an endpoint with an empty context.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            context: EndpointContext::default(),
        }
    }

    /// Attach a context.
    pub fn with_context(mut self, context: EndpointContext) -> Self {
        self.context = context;
        self
    }

    /// Source label, empty when the discovery layer supplied none.
    pub fn source(&self) -> &str {
        self.context.source.as_deref().unwrap_or("")
    }

    /// Port to probe.
    ///
    /// A named port is looked up in the port map; when the name is absent
    /// the endpoint's own port is used.
    pub fn resolve_port(&self, port_name: Option<&str>) -> u16 {
        port_name
            .and_then(|name| self.context.port_map.get(name).copied())
            .unwrap_or(self.port)
    }

    /// Key used to identify this endpoint in registries and logs.
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Job coordinates from which a dotted `cluster.role.env.job.shard` source
/// label is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceLabel {
    pub cluster: String,
    pub role: String,
    pub environment: String,
    pub job: String,
    pub shard: u32,
}

impl SourceLabel {
    /// The label, or `None` if any name component is empty.
    pub fn render(&self) -> Option<String> {
        let parts = [&self.cluster, &self.role, &self.environment, &self.job];
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(format!(
            "{}.{}.{}.{}.{}",
            self.cluster, self.role, self.environment, self.job, self.shard
        ))
    }
}
