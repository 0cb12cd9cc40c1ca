//! # Function-backed cycle handler (`CycleFn`)
//!
//! [`CycleFn`] wraps a closure `F: Fn(WorkerContext) -> Fut` as the `cycle`
//! hook, producing a fresh future per iteration. This avoids shared mutable
//! state; handlers that need state across iterations capture an `Arc<...>`
//! explicitly inside the closure.
//!
//! The four optional hooks keep their default no-op bodies; implement
//! [`CycleHandler`] directly when `on_start`/`on_stop` logic is needed.
//!
//! ## Example
//! ```rust
//! use cyclevisor::{CycleError, CycleFn, HandlerRef, WorkerContext};
//!
//! let handler: HandlerRef = CycleFn::arc(|ctx: WorkerContext| async move {
//!     if !ctx.can_loop() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, CycleError>(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::WorkerContext;
use crate::error::CycleError;
use crate::handlers::handler::CycleHandler;

/// Function-backed cycle handler.
///
/// Wraps a closure that *creates* a new future per iteration.
pub struct CycleFn<F> {
    f: F,
}

impl<F> CycleFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`CycleFn::arc`] when you immediately need a
    /// [`HandlerRef`](crate::HandlerRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> CycleHandler for CycleFn<F>
where
    F: Fn(WorkerContext) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), CycleError>> + Send + 'static,
{
    async fn cycle(&self, ctx: &WorkerContext) -> Result<(), CycleError> {
        (self.f)(ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

    use tokio_util::sync::CancellationToken;

    use crate::core::ExecutionId;

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

    #[tokio::test]
    async fn test_closure_runs_per_cycle() {
        let count = Arc::new(AtomicI64::new(0));
        let seen = count.clone();
        let handler = CycleFn::new(move |_ctx| {
            let count = seen.clone();
            async move {
                count.fetch_add(1, AtomicOrdering::Relaxed);
                Ok::<_, CycleError>(())
            }
        });

        let ctx = context();
        handler.cycle(&ctx).await.expect("cycle succeeds");
        handler.cycle(&ctx).await.expect("cycle succeeds");
        assert_eq!(count.load(AtomicOrdering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_optional_hooks_default_to_success() {
        let handler = CycleFn::new(|_ctx| async { Ok::<_, CycleError>(()) });
        let ctx = context();

        handler.on_start(&ctx).await;
        assert!(handler.before_cycle(&ctx).await.is_ok());
        assert!(handler.after_cycle(&ctx).await.is_ok());
        handler.on_stop(&ctx).await;
    }
}
