//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Start delay → Supervisor.apply
//!
//! Reload (supervisor.rs):
//!     Watcher delivers config → Supervisor.apply reconciles adjusters
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown.trigger → Supervisor.shutdown → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: an invalid config at startup is fatal, an invalid reload is not
//! - Shutdown aborts in-flight probes; reloads let them finish

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::Shutdown;
pub use supervisor::Supervisor;
