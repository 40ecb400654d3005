//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Adjusters produce:
//!     → logging.rs (structured log events: event, result, source, check_uri)
//!     → metrics.rs (counters and gauges via an injected TelemetrySink)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields so logs can be machine parsed
//! - Metrics are cheap (atomic increments)
//! - The sink is injected, so the core runs without a recorder in tests

pub mod logging;
pub mod metrics;
