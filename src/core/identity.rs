//! Execution identifiers.
//!
//! Each scheduled unit generates its own [`ExecutionId`] from a process-wide
//! monotonic counter, once it is actually running. Until then the owner
//! observes [`ExecutionId::UNASSIGNED`]; `start()` does not return before
//! the id has been recorded.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

/// Process-wide counter for execution ids. Starts at 1 so that the
/// sentinel value never collides with a generated id.
static NEXT_EXECUTION_ID: AtomicI64 = AtomicI64::new(1);

/// Identifier of one scheduled execution unit.
///
/// Generated by the unit itself during the start handshake. A fresh handle
/// reports [`ExecutionId::UNASSIGNED`]; after `start()` returns the id is
/// valid and stays readable across `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionId(i64);

impl ExecutionId {
    /// Sentinel for "no unit has been scheduled yet".
    pub const UNASSIGNED: ExecutionId = ExecutionId(-1);

    /// Returns `true` once a scheduled unit has recorded its id.
    pub fn is_assigned(&self) -> bool {
        self.0 >= 0
    }

    /// Raw numeric form, `-1` when unassigned.
    pub fn raw(&self) -> i64 {
        self.0
    }

    pub(crate) fn from_raw(raw: i64) -> Self {
        ExecutionId(raw)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("unassigned")
        }
    }
}

/// Generates the next execution id. Called by the driver, never the owner.
pub(crate) fn next() -> ExecutionId {
    ExecutionId(NEXT_EXECUTION_ID.fetch_add(1, AtomicOrdering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_unassigned() {
        assert!(!ExecutionId::UNASSIGNED.is_assigned());
        assert_eq!(ExecutionId::UNASSIGNED.raw(), -1);
        assert_eq!(ExecutionId::UNASSIGNED.to_string(), "unassigned");
    }

    #[test]
    fn test_generated_ids_are_assigned_and_monotonic() {
        let a = next();
        let b = next();
        assert!(a.is_assigned());
        assert!(b.is_assigned());
        assert!(b.raw() > a.raw());
        assert_eq!(a.to_string(), a.raw().to_string());
    }
}
