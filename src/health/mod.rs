//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active checks (active.rs):
//!     Per-endpoint timer
//!     → probe.rs (one bounded HTTP request)
//!     → result.rs (classify outcome)
//!     → state.rs (sliding-window evaluation)
//!     → on flip: update signal + telemetry
//!
//! State machine (state.rs):
//!     Initializing → Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Health state is per-endpoint; one adjuster per monitored endpoint
//! - State transitions require consecutive successes/failures
//! - Local failures are classified but never move status

pub mod active;
pub mod endpoint;
pub mod probe;
pub mod result;
pub mod settings;
pub mod state;

pub use active::{HealthSnapshot, HttpHealthCheck};
pub use endpoint::{Endpoint, EndpointContext};
pub use result::{CheckResultKind, ProbeError};
pub use settings::{CheckSettings, ConfigError};
pub use state::HealthStatus;
