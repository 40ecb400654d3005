//! Endpoint health state machine.
//!
//! # States
//! - Initializing: no verdict yet, endpoint receives no traffic
//! - Healthy: endpoint receives traffic
//! - Unhealthy: endpoint excluded from rotation
//!
//! # State Transitions
//! ```text
//! Initializing → Healthy | Unhealthy
//! Healthy → Unhealthy: last unhealthy_threshold results all unhealthy
//! Unhealthy → Healthy: last healthy_threshold results all healthy
//! ```
//!
//! # Design Decisions
//! - Sliding window of size healthy_threshold + unhealthy_threshold
//! - Results in the unchanged set never enter the window
//! - Thresholds are non-zero by construction, so both lookbacks can never
//!   pass on the same fold (the newest entry is either healthy or unhealthy)

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;

use crate::health::result::{CheckResultKind, Disposition};

/// Current verdict for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    Initializing,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Statuses that receive traffic.
    pub fn receives_traffic(self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Initializing => "initializing",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded ring buffer of recent results, oldest first.
#[derive(Debug, Clone)]
pub struct CheckHistory {
    entries: VecDeque<CheckResultKind>,
    capacity: usize,
}

impl CheckHistory {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity: capacity.get(),
        }
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, kind: CheckResultKind) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(kind);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if the newest `n` entries exist and all satisfy `pred`.
    fn last_n_all(&self, n: usize, pred: impl Fn(CheckResultKind) -> bool) -> bool {
        self.entries.len() >= n && self.entries.iter().rev().take(n).all(|k| pred(*k))
    }

    /// Copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<CheckResultKind> {
        self.entries.iter().copied().collect()
    }
}

/// Result of folding one check result into the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

/// Sliding-window evaluator with independent healthy/unhealthy thresholds.
#[derive(Debug, Clone)]
pub struct Evaluator {
    healthy_threshold: usize,
    unhealthy_threshold: usize,
    history: CheckHistory,
    status: HealthStatus,
}

impl Evaluator {
    pub fn new(healthy_threshold: NonZeroUsize, unhealthy_threshold: NonZeroUsize) -> Self {
        let capacity = healthy_threshold.saturating_add(unhealthy_threshold.get());
        Self {
            healthy_threshold: healthy_threshold.get(),
            unhealthy_threshold: unhealthy_threshold.get(),
            history: CheckHistory::with_capacity(capacity),
            status: HealthStatus::Initializing,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn history(&self) -> &CheckHistory {
        &self.history
    }

    /// Fold one result into the window.
    ///
    /// Returns the transition if the status changed.
    pub fn fold(&mut self, kind: CheckResultKind) -> Option<Transition> {
        if kind.disposition() == Disposition::Unchanged {
            return None;
        }

        self.history.push(kind);

        let calculated = if self.history.last_n_all(self.healthy_threshold, CheckResultKind::is_healthy) {
            HealthStatus::Healthy
        } else if self.history.last_n_all(self.unhealthy_threshold, CheckResultKind::is_unhealthy) {
            HealthStatus::Unhealthy
        } else {
            self.status
        };

        if calculated == self.status {
            return None;
        }

        let transition = Transition {
            from: self.status,
            to: calculated,
        };
        self.status = calculated;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CheckResultKind::*;

    fn evaluator(healthy: usize, unhealthy: usize) -> Evaluator {
        Evaluator::new(
            NonZeroUsize::new(healthy).unwrap(),
            NonZeroUsize::new(unhealthy).unwrap(),
        )
    }

    #[test]
    fn test_starts_initializing() {
        let e = evaluator(2, 2);
        assert_eq!(e.status(), HealthStatus::Initializing);
        assert!(e.history().is_empty());
    }

    #[test]
    fn test_two_successes_then_two_errors() {
        let mut e = evaluator(2, 2);
        assert_eq!(e.fold(Success), None);
        assert_eq!(
            e.fold(Success),
            Some(Transition { from: HealthStatus::Initializing, to: HealthStatus::Healthy })
        );

        assert_eq!(e.fold(ErrorCode), None);
        assert_eq!(e.status(), HealthStatus::Healthy);
        assert_eq!(
            e.fold(ErrorCode),
            Some(Transition { from: HealthStatus::Healthy, to: HealthStatus::Unhealthy })
        );
    }

    #[test]
    fn test_single_success_below_threshold() {
        let mut e = evaluator(2, 2);
        e.fold(Success);
        assert_eq!(e.status(), HealthStatus::Initializing);
    }

    #[test]
    fn test_local_error_never_recorded() {
        let mut e = evaluator(2, 2);
        e.fold(Success);
        assert_eq!(e.fold(KnownLocalError), None);
        assert_eq!(e.history().snapshot(), vec![Success]);

        // A local error between two successes does not break the run.
        assert!(e.fold(Success).is_some());
        assert_eq!(e.status(), HealthStatus::Healthy);

        for _ in 0..10 {
            assert_eq!(e.fold(KnownLocalError), None);
        }
        assert_eq!(e.status(), HealthStatus::Healthy);
        assert_eq!(e.history().len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut e = evaluator(3, 2);
        let sequence = [Success, Timeout, UnknownError, Success, ErrorCode, Success, Success];
        for _ in 0..5 {
            for kind in sequence {
                e.fold(kind);
                assert!(e.history().len() <= 5);
            }
        }
        assert_eq!(e.history().capacity(), 5);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut e = evaluator(1, 1);
        e.fold(Success);
        e.fold(Timeout);
        e.fold(ConnectionError);
        assert_eq!(e.history().snapshot(), vec![Timeout, ConnectionError]);
    }

    #[test]
    fn test_mixed_results_hold_status() {
        let mut e = evaluator(2, 2);
        e.fold(Success);
        e.fold(Success);
        // Alternating results never satisfy either lookback.
        for _ in 0..4 {
            assert_eq!(e.fold(Timeout), None);
            assert_eq!(e.fold(Success), None);
        }
        assert_eq!(e.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_asymmetric_thresholds() {
        let mut e = evaluator(3, 1);
        e.fold(Success);
        e.fold(Success);
        e.fold(Success);
        assert_eq!(e.status(), HealthStatus::Healthy);

        // One failure is enough to pull the endpoint.
        e.fold(KnownRemoteError);
        assert_eq!(e.status(), HealthStatus::Unhealthy);

        e.fold(Success);
        e.fold(Success);
        assert_eq!(e.status(), HealthStatus::Unhealthy);
        e.fold(Success);
        assert_eq!(e.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_initializing_to_unhealthy() {
        let mut e = evaluator(2, 2);
        e.fold(UnknownError);
        assert_eq!(
            e.fold(ConnectionError),
            Some(Transition { from: HealthStatus::Initializing, to: HealthStatus::Unhealthy })
        );
    }
}
