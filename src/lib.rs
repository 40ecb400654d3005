//! Endpoint health evaluation for a reverse proxy's traffic-shaping layer.
//!
//! Each monitored endpoint gets an [`HttpHealthCheck`] adjuster that probes it
//! on a fixed interval, debounces the results through a sliding window and
//! exposes the verdict as a share multiplier (`1.0` healthy, `0.0` otherwise).

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod share;

pub use config::CheckerConfig;
pub use health::{Endpoint, HealthStatus, HttpHealthCheck};
pub use lifecycle::{Shutdown, Supervisor};
pub use share::{AuditableShare, ShareAdjuster, UpdateSignal};
