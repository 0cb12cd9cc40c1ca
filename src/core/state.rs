//! Driver lifecycle states.
//!
//! The cycle driver publishes its progress through [`WorkerState`] over a
//! `tokio::sync::watch` channel. The handle's `start()` waits for the state
//! to leave [`WorkerState::Idle`] (the execution id is recorded just
//! before), and a joinable `stop()` waits for [`WorkerState::Terminated`],
//! the single authoritative completion signal, published only after the
//! loop body and `on_stop` have fully returned.
//!
//! ```text
//! Idle ──► Handshaking ──► Looping ──► Draining ──► Terminated
//!                │                        ▲
//!                └── stop before gate ────┘   (zero cycles executed)
//! ```

/// Lifecycle state of one worker's execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No unit is scheduled, or a scheduled unit has not yet recorded its id.
    Idle,
    /// Id recorded, `on_start` running or run gate not yet released.
    Handshaking,
    /// Repeating cycle iterations.
    Looping,
    /// Loop exited; `on_stop` in progress.
    Draining,
    /// The unit's entire body, `on_stop` included, has returned.
    Terminated,
}

impl WorkerState {
    /// `true` before the first start handshake.
    pub fn is_idle(&self) -> bool {
        matches!(self, WorkerState::Idle)
    }

    /// `true` from handshake entry until the final `on_stop` return.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            WorkerState::Handshaking | WorkerState::Looping | WorkerState::Draining
        )
    }

    /// `true` once the unit has fully exited.
    pub fn is_terminated(&self) -> bool {
        matches!(self, WorkerState::Terminated)
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Handshaking => "handshaking",
            WorkerState::Looping => "looping",
            WorkerState::Draining => "draining",
            WorkerState::Terminated => "terminated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates_partition_the_states() {
        let all = [
            WorkerState::Idle,
            WorkerState::Handshaking,
            WorkerState::Looping,
            WorkerState::Draining,
            WorkerState::Terminated,
        ];
        for state in all {
            let flags = [state.is_idle(), state.is_active(), state.is_terminated()];
            assert_eq!(
                flags.iter().filter(|f| **f).count(),
                1,
                "{} must match exactly one predicate",
                state.as_label()
            );
        }
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(WorkerState::Idle.as_label(), "idle");
        assert_eq!(WorkerState::Handshaking.as_label(), "handshaking");
        assert_eq!(WorkerState::Looping.as_label(), "looping");
        assert_eq!(WorkerState::Draining.as_label(), "draining");
        assert_eq!(WorkerState::Terminated.as_label(), "terminated");
    }
}
