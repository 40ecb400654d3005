//! Share adjustment contract.
//!
//! # Data Flow
//! ```text
//! Adjuster status changes
//!     → UpdateSignal invoked (no arguments)
//!     → proxy re-reads auditable_share() of every adjuster
//!     → routing weights recomputed (outside this crate)
//! ```
//!
//! # Design Decisions
//! - A share is a multiplier in [0.0, 1.0] paired with an audit record
//! - Adjusters never compose shares; that belongs to the caller
//! - Signal failures are returned as values, never panics

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::health::endpoint::Endpoint;
use crate::health::state::HealthStatus;

/// One annotation explaining a share value, e.g. `health=1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditItem {
    pub source: String,
    pub value: String,
}

impl AuditItem {
    pub fn new(source: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for AuditItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.source, self.value)
    }
}

/// A share multiplier and the reason for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditableShare {
    pub share: f64,
    pub audit: AuditItem,
}

/// Error returned by an update-signal receiver.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The receiving side has gone away.
    #[error("Update receiver closed")]
    Closed,

    #[error("Update failed: {0}")]
    Failed(String),

    #[error("Update callback panicked: {0}")]
    Panicked(String),
}

impl SignalError {
    /// Label used when counting callback failures.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalError::Closed => "closed",
            SignalError::Failed(_) => "failed",
            SignalError::Panicked(_) => "panicked",
        }
    }
}

/// Zero-argument notification invoked on every status transition.
pub type UpdateSignal = Arc<dyn Fn() -> Result<(), SignalError> + Send + Sync>;

/// A strategy that scales the traffic an endpoint receives.
pub trait ShareAdjuster: Send + Sync {
    /// Endpoint this adjuster evaluates.
    fn endpoint(&self) -> &Endpoint;

    /// Begin the check loop.
    ///
    /// Not guarded: calling twice schedules two loops.
    fn start(&self) -> JoinHandle<()>;

    /// Request that no further checks are scheduled.
    fn stop(&self);

    /// Current state-machine state.
    fn status(&self) -> HealthStatus;

    /// Current share multiplier with its audit record.
    fn auditable_share(&self) -> AuditableShare;
}
