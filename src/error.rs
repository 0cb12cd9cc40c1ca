//! Error types used by the worker handle and cycle handlers.
//!
//! This module defines two main error enums:
//!
//! - [`WorkerError`]: errors raised while starting a worker.
//! - [`CycleError`]: errors raised by handler hooks during a cycle.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics, plus [`CycleError::is_graceful_close`] which marks the
//! one failure kind the driver reports quietly instead of as a warning.

use thiserror::Error;

/// # Errors produced while starting a worker.
///
/// These are fatal to the `start()` call that produced them; the handle
/// stays idle and a later `start()` may succeed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The runtime could not schedule the execution unit.
    #[error("failed to schedule worker {name:?}: {reason}")]
    Scheduling {
        /// Diagnostic worker name.
        name: String,
        /// What the runtime reported.
        reason: String,
    },

    /// The unit exited before finishing its start handshake.
    ///
    /// The driver vanished before an execution id was assigned, so the
    /// owner never released the run gate. Not a normal path.
    #[error("worker {name:?} exited before completing its start handshake")]
    HandshakeAborted {
        /// Diagnostic worker name.
        name: String,
    },
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cyclevisor::WorkerError;
    ///
    /// let err = WorkerError::Scheduling {
    ///     name: "rx".into(),
    ///     reason: "no runtime".into(),
    /// };
    /// assert_eq!(err.as_label(), "worker_scheduling");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Scheduling { .. } => "worker_scheduling",
            WorkerError::HandshakeAborted { .. } => "worker_handshake_aborted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Scheduling { name, reason } => {
                format!("scheduling {name:?} failed: {reason}")
            }
            WorkerError::HandshakeAborted { name } => {
                format!("{name:?} aborted during start handshake")
            }
        }
    }
}

/// # Errors produced by handler hooks.
///
/// Any of these returned from `before_cycle`, `cycle`, or `after_cycle` is
/// recoverable: the driver reports it and retries on the next iteration.
/// Only the owner's stop request ends the loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CycleError {
    /// Hook execution failed; the loop will retry.
    #[error("cycle failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The remote peer closed the connection in an expected way.
    ///
    /// Reported without warning-level noise; the loop still retries.
    #[error("peer closed the connection")]
    GracefulClose,

    /// A blocking call inside `cycle` was unblocked by a stop request.
    #[error("interrupted by stop request")]
    Interrupted,
}

impl CycleError {
    /// Wraps an arbitrary error message as a recoverable failure.
    pub fn fail(error: impl Into<String>) -> Self {
        CycleError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cyclevisor::CycleError;
    ///
    /// let err = CycleError::fail("boom");
    /// assert_eq!(err.as_label(), "cycle_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CycleError::Fail { .. } => "cycle_failed",
            CycleError::GracefulClose => "cycle_peer_closed",
            CycleError::Interrupted => "cycle_interrupted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CycleError::Fail { error } => format!("error: {error}"),
            CycleError::GracefulClose => "peer closed".to_string(),
            CycleError::Interrupted => "interrupted".to_string(),
        }
    }

    /// Indicates the quiet failure kind: an expected remote-initiated
    /// disconnect, not a bug.
    ///
    /// # Example
    /// ```
    /// use cyclevisor::CycleError;
    ///
    /// assert!(CycleError::GracefulClose.is_graceful_close());
    /// assert!(!CycleError::fail("boom").is_graceful_close());
    /// ```
    pub fn is_graceful_close(&self) -> bool {
        matches!(self, CycleError::GracefulClose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_error_labels_are_stable() {
        let scheduling = WorkerError::Scheduling {
            name: "rx".into(),
            reason: "no runtime".into(),
        };
        let aborted = WorkerError::HandshakeAborted { name: "rx".into() };

        assert_eq!(scheduling.as_label(), "worker_scheduling");
        assert_eq!(aborted.as_label(), "worker_handshake_aborted");
        assert!(scheduling.as_message().contains("no runtime"));
        assert!(aborted.as_message().contains("rx"));
    }

    #[test]
    fn test_cycle_error_labels_are_stable() {
        assert_eq!(CycleError::fail("x").as_label(), "cycle_failed");
        assert_eq!(CycleError::GracefulClose.as_label(), "cycle_peer_closed");
        assert_eq!(CycleError::Interrupted.as_label(), "cycle_interrupted");
    }

    #[test]
    fn test_only_peer_close_is_graceful() {
        assert!(CycleError::GracefulClose.is_graceful_close());
        assert!(!CycleError::fail("boom").is_graceful_close());
        assert!(!CycleError::Interrupted.is_graceful_close());
    }

    #[test]
    fn test_fail_keeps_the_message() {
        let err = CycleError::fail("connection refused");
        assert_eq!(err.to_string(), "cycle failed: connection refused");
        assert!(err.as_message().contains("connection refused"));
    }
}
