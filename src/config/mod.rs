//! Checker configuration.
//!
//! ```text
//! health-share.toml
//!     → loader.rs     read + toml parse
//!     → validation.rs every semantic problem, collected
//!     → CheckerConfig
//!
//! watcher.rs: file modified → load again → changed and valid? → supervisor
//! ```
//!
//! Every field has a default, so an empty file is a valid (if idle) config.
//! Endpoint-level `health_check` tables are partial and merge over the
//! global one field by field.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{CheckerConfig, EndpointConfig, HealthCheckConfig, ObservabilityConfig};
