//! # Cycle handler abstraction.
//!
//! This module defines the [`CycleHandler`] trait: the capability interface
//! a worker owner implements to supply the actual work. The common handle
//! type is [`HandlerRef`], an `Arc<dyn CycleHandler>` suitable for sharing
//! with the spawned unit.
//!
//! The driver calls the hooks in a fixed order, forever, until told to
//! stop:
//!
//! ```text
//! on_start ──► (before_cycle ──► cycle ──► after_cycle)* ──► on_stop
//! ```
//!
//! A failing `before_cycle` skips the rest of that iteration; a failing
//! `cycle` skips `after_cycle`. Failures never end the loop.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::WorkerContext;
use crate::error::CycleError;

/// Shared handle to a cycle handler.
pub type HandlerRef = Arc<dyn CycleHandler>;

/// # Capability interface for one worker's repeated work.
///
/// Only [`cycle`](CycleHandler::cycle) is mandatory; the other four hooks
/// default to no-ops (or success). Hooks receive a [`WorkerContext`] for
/// cooperative shutdown checks and interrupt-aware blocking.
///
/// Long-blocking `cycle` bodies should select on
/// [`WorkerContext::interrupted`] so that `stop()` can unblock them
/// promptly.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use cyclevisor::{CycleError, CycleHandler, WorkerContext};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl CycleHandler for Heartbeat {
///     async fn cycle(&self, ctx: &WorkerContext) -> Result<(), CycleError> {
///         if !ctx.can_loop() {
///             return Ok(());
///         }
///         // send one heartbeat...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait CycleHandler: Send + Sync + 'static {
    /// Runs once, right after the unit records its execution id and before
    /// the run gate is awaited.
    async fn on_start(&self, _ctx: &WorkerContext) {}

    /// Runs before every cycle. An `Err` skips this iteration's `cycle`
    /// and `after_cycle`; the loop retries next iteration.
    async fn before_cycle(&self, _ctx: &WorkerContext) -> Result<(), CycleError> {
        Ok(())
    }

    /// One unit of work. The only mandatory hook.
    ///
    /// Returning [`CycleError::GracefulClose`] marks an expected
    /// remote-initiated disconnect; it is reported quietly and the loop
    /// still retries.
    async fn cycle(&self, ctx: &WorkerContext) -> Result<(), CycleError>;

    /// Runs after every successful `cycle`. An `Err` is reported and the
    /// loop continues.
    async fn after_cycle(&self, _ctx: &WorkerContext) -> Result<(), CycleError> {
        Ok(())
    }

    /// Runs exactly once when the unit drains, even if zero cycles ran.
    async fn on_stop(&self, _ctx: &WorkerContext) {}
}
