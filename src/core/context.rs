//! # Cooperative control surface handed to handler hooks.
//!
//! [`WorkerContext`] is the hook-side view of a running worker. It replaces
//! a back-pointer to the handle with a small cloneable capability:
//!
//! - [`WorkerContext::can_loop`]: poll the owner's stop signal mid-cycle;
//! - [`WorkerContext::request_stop`]: end looping after the current cycle,
//!   without interrupting anything;
//! - [`WorkerContext::interrupted`] / [`WorkerContext::interrupt_token`]:
//!   the forced-unblock surface: `stop()` cancels this token so a `cycle`
//!   blocked on I/O can select on it and return
//!   [`CycleError::Interrupted`](crate::CycleError::Interrupted) promptly;
//! - [`WorkerContext::id`]: the unit's execution id.
//!
//! ## Token layout
//! The interrupt token is the parent, the loop token its child. `stop()`
//! cancels the parent (both fire: loop exit plus interrupt); a soft
//! `request_stop` cancels only the child, so a blocked `cycle` keeps
//! blocking until it returns on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use tokio_util::sync::CancellationToken;

use crate::core::identity::ExecutionId;

/// Hook-side handle to a running worker's control state.
///
/// Cheap to clone; all clones observe the same worker.
#[derive(Clone)]
pub struct WorkerContext {
    name: Arc<str>,
    interrupt: CancellationToken,
    loop_token: CancellationToken,
    id_slot: Arc<AtomicI64>,
}

impl WorkerContext {
    pub(crate) fn new(
        name: Arc<str>,
        interrupt: CancellationToken,
        loop_token: CancellationToken,
        id_slot: Arc<AtomicI64>,
    ) -> Self {
        Self {
            name,
            interrupt,
            loop_token,
            id_slot,
        }
    }

    /// Diagnostic worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` while the owner wants the unit to keep looping.
    ///
    /// Poll this from long hook bodies to observe shutdown cooperatively.
    pub fn can_loop(&self) -> bool {
        !self.loop_token.is_cancelled()
    }

    /// Ends looping after the current cycle completes.
    ///
    /// The softer stop variant: no interrupt is issued and nothing is
    /// joined. The driver still drains through `on_stop`.
    pub fn request_stop(&self) {
        self.loop_token.cancel();
    }

    /// Completes when `stop()` interrupts the worker.
    ///
    /// Select on this inside blocking work and return
    /// [`CycleError::Interrupted`](crate::CycleError::Interrupted) to
    /// unblock promptly.
    pub async fn interrupted(&self) {
        self.interrupt.cancelled().await;
    }

    /// `true` once `stop()` has issued the interrupt.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// The raw interrupt token, for composing with `tokio_util` helpers.
    pub fn interrupt_token(&self) -> &CancellationToken {
        &self.interrupt
    }

    /// Execution id of the running unit.
    pub fn id(&self) -> ExecutionId {
        ExecutionId::from_raw(self.id_slot.load(AtomicOrdering::Acquire))
    }

    pub(crate) fn assign_id(&self, id: ExecutionId) {
        self.id_slot.store(id.raw(), AtomicOrdering::Release);
    }

    pub(crate) fn loop_token(&self) -> &CancellationToken {
        &self.loop_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity;

    fn context() -> WorkerContext {
        let interrupt = CancellationToken::new();
        let loop_token = interrupt.child_token();
        WorkerContext::new(
            Arc::from("probe"),
            interrupt,
            loop_token,
            Arc::new(AtomicI64::new(ExecutionId::UNASSIGNED.raw())),
        )
    }

    #[test]
    fn test_request_stop_does_not_interrupt() {
        let ctx = context();
        assert!(ctx.can_loop());

        ctx.request_stop();
        assert!(!ctx.can_loop());
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_interrupt_cancels_the_loop_as_well() {
        let ctx = context();
        ctx.interrupt_token().cancel();
        assert!(ctx.is_interrupted());
        assert!(!ctx.can_loop());
    }

    #[test]
    fn test_id_visible_through_clones() {
        let ctx = context();
        let observer = ctx.clone();
        assert!(!observer.id().is_assigned());

        let id = identity::next();
        ctx.assign_id(id);
        assert_eq!(observer.id(), id);
    }
}
