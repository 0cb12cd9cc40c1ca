//! # Lifecycle events emitted by the worker handle and cycle driver.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Handshake/lifecycle events**: the unit's progress through its state
//!   machine (handshake, loop entry, drain, termination)
//! - **Per-cycle failures**: recoverable hook errors and contained panics
//! - **Stop-side events**: the owner's stop request and ignored join errors
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! worker name, the failing hook stage, and cycle numbers.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! observed out of order.
//!
//! ## Example
//! ```rust
//! use cyclevisor::{Event, EventKind, HookStage};
//!
//! let ev = Event::new(EventKind::CycleFailed)
//!     .with_worker("rx")
//!     .with_stage(HookStage::Cycle)
//!     .with_cycle(3)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::CycleFailed);
//! assert_eq!(ev.worker.as_deref(), Some("rx"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of worker lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Handshake / lifecycle events ===
    /// The unit recorded its execution id and entered the handshake.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `execution_id`: the freshly generated id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    HandshakeEntered,

    /// The run gate was released and the cycle loop begins.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LoopEntered,

    /// Loop exited; `on_stop` is about to run (even if zero cycles ran).
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Draining,

    /// The unit's entire body, `on_stop` included, has returned.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Terminated,

    // === Per-cycle failures ===
    /// A hook returned an error for this iteration; the loop retries.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `stage`: which hook failed
    /// - `cycle`: iteration number (1-based)
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CycleFailed,

    /// `cycle` observed an expected remote-initiated disconnect.
    ///
    /// The quiet counterpart of [`EventKind::CycleFailed`]; the loop still
    /// retries.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `cycle`: iteration number
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    PeerClosed,

    /// A handler hook panicked; the panic was contained.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `stage`: which hook panicked
    /// - `cycle`: iteration number (absent for `on_start`/`on_stop`)
    /// - `reason`: panic message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    HookPanicked,

    // === Stop-side events ===
    /// The owner asked the unit to stop looping.
    ///
    /// Published by both `stop()` and `request_stop()`.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    StopRequested,

    /// Joining the unit failed; ignored because termination is confirmed
    /// independently via the state channel.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: join error message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    JoinFailed,
}

/// Which handler hook an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    OnStart,
    BeforeCycle,
    Cycle,
    AfterCycle,
    OnStop,
}

impl HookStage {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HookStage::OnStart => "on_start",
            HookStage::BeforeCycle => "before_cycle",
            HookStage::Cycle => "cycle",
            HookStage::AfterCycle => "after_cycle",
            HookStage::OnStop => "on_stop",
        }
    }
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker, if applicable.
    pub worker: Option<Arc<str>>,
    /// Execution id of the unit (raw form).
    pub execution_id: Option<i64>,
    /// Hook stage the event refers to.
    pub stage: Option<HookStage>,
    /// Cycle iteration number (1-based).
    pub cycle: Option<u64>,
    /// Human-readable reason (errors, panic messages, join failures).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            execution_id: None,
            stage: None,
            cycle: None,
            reason: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches an execution id (raw form).
    #[inline]
    pub fn with_execution_id(mut self, id: i64) -> Self {
        self.execution_id = Some(id);
        self
    }

    /// Attaches the hook stage.
    #[inline]
    pub fn with_stage(mut self, stage: HookStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attaches a cycle iteration number.
    #[inline]
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
