//! # Cycle driver: the spawned unit's entry point.
//!
//! Drives one handler through the fixed lifecycle, publishing every
//! transition on the state channel and every noteworthy occurrence on the
//! bus.
//!
//! ## State machine
//! ```text
//! Handshaking ──► Looping ──► Draining ──► Terminated
//!      │                         ▲
//!      └── stop before gate ─────┘   (zero cycles executed)
//!
//! Looping, one iteration:
//!   before_cycle ──Err──► report, fall through to delay
//!        │Ok
//!   cycle ────────Err──► report (quiet for peer close), fall through
//!        │Ok
//!   after_cycle ──Err──► report
//!        │
//!   stop requested? ──► exit without sleeping
//!        │no
//!   sleep cycle_interval (skipped when zero)
//! ```
//!
//! ## Rules
//! - Hook failures are swallowed and reported; only the stop signal ends
//!   the loop.
//! - Hook panics are contained (`catch_unwind`) and reported as
//!   [`EventKind::HookPanicked`]; the lifecycle always reaches
//!   `Terminated`, so a joinable `stop()` cannot hang on a buggy handler
//!   that panics.
//! - `Terminated` is published only after `on_stop` has fully returned.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time;

use crate::core::context::WorkerContext;
use crate::core::identity;
use crate::core::state::WorkerState;
use crate::error::CycleError;
use crate::events::{Bus, Event, EventKind, HookStage};
use crate::handlers::HandlerRef;

/// Executes one worker's lifecycle on the spawned unit.
pub(crate) struct Driver {
    handler: HandlerRef,
    cycle_interval: Duration,
    ctx: WorkerContext,
    gate: watch::Receiver<bool>,
    state: watch::Sender<WorkerState>,
    bus: Bus,
}

impl Driver {
    pub(crate) fn new(
        handler: HandlerRef,
        cycle_interval: Duration,
        ctx: WorkerContext,
        gate: watch::Receiver<bool>,
        state: watch::Sender<WorkerState>,
        bus: Bus,
    ) -> Self {
        Self {
            handler,
            cycle_interval,
            ctx,
            gate,
            state,
            bus,
        }
    }

    /// Runs the unit to completion.
    ///
    /// Publishing `Handshaking` is what unblocks the owner's `start()`;
    /// the id must be recorded before that send.
    pub(crate) async fn run(mut self) {
        let id = identity::next();
        self.ctx.assign_id(id);
        let _ = self.state.send(WorkerState::Handshaking);
        self.bus.publish(
            Event::new(EventKind::HandshakeEntered)
                .with_worker(self.ctx.name())
                .with_execution_id(id.raw()),
        );

        self.contain(HookStage::OnStart, self.handler.on_start(&self.ctx))
            .await;

        if self.wait_for_gate().await && self.ctx.can_loop() {
            let _ = self.state.send(WorkerState::Looping);
            self.bus
                .publish(Event::new(EventKind::LoopEntered).with_worker(self.ctx.name()));
            self.run_loop().await;
        }

        let _ = self.state.send(WorkerState::Draining);
        self.bus
            .publish(Event::new(EventKind::Draining).with_worker(self.ctx.name()));
        self.contain(HookStage::OnStop, self.handler.on_stop(&self.ctx))
            .await;

        let _ = self.state.send(WorkerState::Terminated);
        self.bus
            .publish(Event::new(EventKind::Terminated).with_worker(self.ctx.name()));
    }

    /// Waits for the owner to release the run gate.
    ///
    /// Returns `false` when the stop signal wins the race, or when the
    /// handle went away mid-handshake with the gate still closed; the loop
    /// is then skipped with zero cycles executed.
    async fn wait_for_gate(&mut self) -> bool {
        let released = tokio::select! {
            res = self.gate.wait_for(|open| *open) => res.is_ok(),
            _ = self.ctx.loop_token().cancelled() => false,
        };
        // A closed gate channel (handle dropped mid-handshake) leaves the
        // last value in place; an already-open gate still counts.
        released || *self.gate.borrow()
    }

    async fn run_loop(&self) {
        let mut cycle_no: u64 = 0;
        while self.ctx.can_loop() {
            cycle_no += 1;
            self.run_cycle(cycle_no).await;

            if !self.ctx.can_loop() {
                break;
            }
            // A zero interval means a hot loop; progress then relies on the
            // handler's own await points.
            if self.cycle_interval.is_zero() {
                continue;
            }
            tokio::select! {
                _ = time::sleep(self.cycle_interval) => {}
                _ = self.ctx.loop_token().cancelled() => break,
            }
        }
    }

    /// One iteration. Failures are reported and swallowed; a failing
    /// `before_cycle` skips `cycle`, a failing `cycle` skips `after_cycle`.
    async fn run_cycle(&self, cycle_no: u64) {
        if self
            .invoke(
                HookStage::BeforeCycle,
                cycle_no,
                self.handler.before_cycle(&self.ctx),
            )
            .await
            .is_err()
        {
            return;
        }
        if self
            .invoke(HookStage::Cycle, cycle_no, self.handler.cycle(&self.ctx))
            .await
            .is_err()
        {
            return;
        }
        let _ = self
            .invoke(
                HookStage::AfterCycle,
                cycle_no,
                self.handler.after_cycle(&self.ctx),
            )
            .await;
    }

    /// Calls one fallible hook, containing panics and publishing failures.
    ///
    /// Only `cycle` is inspected for the graceful-peer-close special case.
    async fn invoke<F>(&self, stage: HookStage, cycle_no: u64, hook: F) -> Result<(), ()>
    where
        F: std::future::Future<Output = Result<(), CycleError>>,
    {
        match AssertUnwindSafe(hook).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                if stage == HookStage::Cycle && err.is_graceful_close() {
                    self.bus.publish(
                        Event::new(EventKind::PeerClosed)
                            .with_worker(self.ctx.name())
                            .with_cycle(cycle_no),
                    );
                } else {
                    self.bus.publish(
                        Event::new(EventKind::CycleFailed)
                            .with_worker(self.ctx.name())
                            .with_stage(stage)
                            .with_cycle(cycle_no)
                            .with_reason(err.to_string()),
                    );
                }
                Err(())
            }
            Err(panic) => {
                self.bus.publish(
                    Event::new(EventKind::HookPanicked)
                        .with_worker(self.ctx.name())
                        .with_stage(stage)
                        .with_cycle(cycle_no)
                        .with_reason(panic_message(panic)),
                );
                Err(())
            }
        }
    }

    /// Calls one infallible lifecycle hook, containing panics.
    async fn contain<F>(&self, stage: HookStage, hook: F)
    where
        F: std::future::Future<Output = ()>,
    {
        if let Err(panic) = AssertUnwindSafe(hook).catch_unwind().await {
            self.bus.publish(
                Event::new(EventKind::HookPanicked)
                    .with_worker(self.ctx.name())
                    .with_stage(stage)
                    .with_reason(panic_message(panic)),
            );
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
