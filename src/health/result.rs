//! Probe outcome classification.
//!
//! # Responsibilities
//! - Define the fixed set of check result kinds
//! - Partition kinds into healthy / unhealthy / unchanged
//! - Map one probe outcome to exactly one kind plus a status-code label
//!
//! # Design Decisions
//! - Probes return `Result<u16, ProbeError>`; classification is a pure match
//! - Only HTTP 200 counts as success
//! - Transport failures carry a synthetic gateway status code for labeling

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Status-code label for failures that never produced a response,
/// timeouts included.
pub const GATEWAY_STATUS: u16 = 502;

/// Result of a single check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckResultKind {
    Success,
    ErrorCode,
    ConnectionError,
    Timeout,
    KnownLocalError,
    KnownRemoteError,
    UnknownError,
}

/// How a result kind affects the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Healthy,
    Unhealthy,
    /// Not recorded in history; cannot move status.
    Unchanged,
}

impl CheckResultKind {
    pub fn disposition(self) -> Disposition {
        match self {
            CheckResultKind::Success => Disposition::Healthy,
            CheckResultKind::KnownLocalError => Disposition::Unchanged,
            CheckResultKind::ErrorCode
            | CheckResultKind::KnownRemoteError
            | CheckResultKind::Timeout
            | CheckResultKind::ConnectionError
            | CheckResultKind::UnknownError => Disposition::Unhealthy,
        }
    }

    pub fn is_healthy(self) -> bool {
        self.disposition() == Disposition::Healthy
    }

    pub fn is_unhealthy(self) -> bool {
        self.disposition() == Disposition::Unhealthy
    }

    /// Label value used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckResultKind::Success => "success",
            CheckResultKind::ErrorCode => "error_code",
            CheckResultKind::ConnectionError => "connection_error",
            CheckResultKind::Timeout => "timeout",
            CheckResultKind::KnownLocalError => "known_local_error",
            CheckResultKind::KnownRemoteError => "known_remote_error",
            CheckResultKind::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for CheckResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a probe can report instead of a status code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// The remote answered with a well-formed error response.
    #[error("HTTP error response: {status}")]
    Http { status: u16 },

    /// Transport-level failure (DNS, refused, reset, unreachable).
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The probe did not complete within its timeout.
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    /// The check URI could not be parsed.
    #[error("Invalid check URI: {0}")]
    InvalidUri(String),

    /// Failure on our side that says nothing about the remote.
    #[error("Local failure: {0}")]
    LocalResource(String),
}

/// Outcome of one probe attempt.
pub type ProbeOutcome = Result<u16, ProbeError>;

/// A classified probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: CheckResultKind,
    /// HTTP status (real or synthetic) for labeling, if applicable.
    pub status_code: Option<u16>,
}

/// Map a probe outcome to a result kind.
pub fn classify(outcome: &ProbeOutcome) -> Classification {
    let (kind, status_code) = match outcome {
        Ok(200) => (CheckResultKind::Success, None),
        Ok(status) => (CheckResultKind::ErrorCode, Some(*status)),
        Err(ProbeError::Http { status }) => (CheckResultKind::ErrorCode, Some(*status)),
        Err(ProbeError::Connect(_)) | Err(ProbeError::InvalidUri(_)) => {
            (CheckResultKind::UnknownError, Some(GATEWAY_STATUS))
        }
        Err(ProbeError::Timeout(_)) => (CheckResultKind::Timeout, Some(GATEWAY_STATUS)),
        Err(ProbeError::LocalResource(_)) => (CheckResultKind::KnownLocalError, None),
    };
    Classification { kind, status_code }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_200_is_success() {
        let c = classify(&Ok(200));
        assert_eq!(c.kind, CheckResultKind::Success);
        assert_eq!(c.status_code, None);
    }

    #[test]
    fn test_other_codes_are_error_code() {
        for status in [201, 204, 301, 404, 500, 503] {
            let c = classify(&Ok(status));
            assert_eq!(c.kind, CheckResultKind::ErrorCode, "status {}", status);
            assert_eq!(c.status_code, Some(status));
        }
    }

    #[test]
    fn test_structured_http_error_keeps_code() {
        let c = classify(&Err(ProbeError::Http { status: 503 }));
        assert_eq!(c.kind, CheckResultKind::ErrorCode);
        assert_eq!(c.status_code, Some(503));
    }

    #[test]
    fn test_transport_error_is_unknown_with_gateway_code() {
        let c = classify(&Err(ProbeError::Connect("connection refused".into())));
        assert_eq!(c.kind, CheckResultKind::UnknownError);
        assert_eq!(c.status_code, Some(GATEWAY_STATUS));
    }

    #[test]
    fn test_timeout() {
        let c = classify(&Err(ProbeError::Timeout(Duration::from_secs(3))));
        assert_eq!(c.kind, CheckResultKind::Timeout);
        assert_eq!(c.status_code, Some(GATEWAY_STATUS));
    }

    #[test]
    fn test_local_failure_is_unchanged() {
        let c = classify(&Err(ProbeError::LocalResource("too many open files".into())));
        assert_eq!(c.kind, CheckResultKind::KnownLocalError);
        assert_eq!(c.kind.disposition(), Disposition::Unchanged);
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let all = [
            CheckResultKind::Success,
            CheckResultKind::ErrorCode,
            CheckResultKind::ConnectionError,
            CheckResultKind::Timeout,
            CheckResultKind::KnownLocalError,
            CheckResultKind::KnownRemoteError,
            CheckResultKind::UnknownError,
        ];
        let healthy: Vec<_> = all.iter().filter(|k| k.is_healthy()).collect();
        let unhealthy = all.iter().filter(|k| k.is_unhealthy()).count();
        assert_eq!(healthy, vec![&CheckResultKind::Success]);
        assert_eq!(unhealthy, 5);
    }
}
