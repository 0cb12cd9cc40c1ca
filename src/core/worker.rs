//! # Worker: the owner-side handle of one supervised execution unit.
//!
//! The [`Worker`] owns the unit's identity and lifecycle: it schedules the
//! cycle driver onto the tokio runtime, drives the start handshake, and
//! coordinates shutdown so the owner never observes a half-initialized unit
//! and never tears one down mid-cycle.
//!
//! ## High-level architecture
//! ```text
//! Owner side:                         Unit side (spawned task):
//!   Worker::start()                     Driver::run()
//!     ├─ spawn(driver)                    ├─ record execution id
//!     ├─ await state ≠ Idle  ◄────────────┤ publish Handshaking
//!     ├─ release run gate ────────────►   ├─ on_start, await gate
//!     └─ return Ok                        ├─ loop: before/cycle/after
//!   Worker::stop()                        │        + interval sleep
//!     ├─ cancel interrupt token ──────►   ├─ loop exits at boundary
//!     ├─ join (failures ignored)          ├─ on_stop
//!     └─ await state = Terminated ◄───────┘ publish Terminated
//! ```
//!
//! ## Ordering guarantees
//! - `start()` never returns `Ok` before the execution id is assigned.
//! - The run gate is released exactly once per `start()`, and only after
//!   the id became readable.
//! - A joinable `stop()` never returns before the unit's entire body,
//!   `on_stop` included, has completed; the join result alone is not
//!   trusted; termination is confirmed on the state channel.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use cyclevisor::{CycleError, CycleFn, Worker, WorkerContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ticks = Arc::new(AtomicU32::new(0));
//!     let seen = ticks.clone();
//!     let handler = CycleFn::arc(move |ctx: WorkerContext| {
//!         let ticks = seen.clone();
//!         async move {
//!             if ticks.fetch_add(1, Ordering::Relaxed) + 1 >= 3 {
//!                 ctx.request_stop();
//!             }
//!             Ok::<_, CycleError>(())
//!         }
//!     });
//!
//!     let mut worker = Worker::new("ticker", handler, Duration::from_millis(1), true);
//!     worker.start().await?;
//!     assert!(worker.id().is_assigned());
//!
//!     // Let it run until it asks to stop itself, then tear down.
//!     while worker.can_loop() {
//!         tokio::time::sleep(Duration::from_millis(1)).await;
//!     }
//!     worker.stop().await;
//!     assert_eq!(ticks.load(Ordering::Relaxed), 3);
//!     Ok(())
//! }
//! ```

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::context::WorkerContext;
use crate::core::driver::Driver;
use crate::core::identity::ExecutionId;
use crate::core::state::WorkerState;
use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;

/// Bookkeeping for one in-flight unit: join handle, control tokens, state
/// feed, and the gate sender.
struct Running {
    join: JoinHandle<()>,
    interrupt: CancellationToken,
    loop_token: CancellationToken,
    state: watch::Receiver<WorkerState>,
    // Kept alive so the driver can trust the gate channel until stop.
    _gate: watch::Sender<bool>,
}

/// Supervises the lifecycle of one cooperatively-scheduled execution unit.
///
/// Construction binds a [`CycleHandler`](crate::CycleHandler), an
/// inter-cycle delay (zero = hot loop, no sleep), and the join mode:
/// when `joinable` is true, [`Worker::stop`] blocks until the unit has
/// fully exited; otherwise stop signals and returns immediately.
///
/// Dropping a `Worker` performs the non-joining stop: the interrupt token
/// is cancelled and the unit drains through `on_stop` at its next
/// suspension point. Call [`Worker::stop`] with `joinable = true` when
/// teardown must be confirmed.
pub struct Worker {
    name: Cow<'static, str>,
    handler: HandlerRef,
    cycle_interval: Duration,
    joinable: bool,
    bus: Bus,
    id_slot: Arc<AtomicI64>,
    state_rx: Option<watch::Receiver<WorkerState>>,
    running: Option<Running>,
}

impl Worker {
    /// Creates an idle worker bound to the given handler.
    ///
    /// ### Parameters
    /// - `name`: diagnostic name carried on every event
    /// - `handler`: the hook implementation the driver calls into
    /// - `cycle_interval`: delay between iterations (zero = no sleep)
    /// - `joinable`: whether `stop()` waits for confirmed termination
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        handler: HandlerRef,
        cycle_interval: Duration,
        joinable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            handler,
            cycle_interval,
            joinable,
            bus: Bus::default(),
            id_slot: Arc::new(AtomicI64::new(ExecutionId::UNASSIGNED.raw())),
            state_rx: None,
            running: None,
        }
    }

    /// Replaces the event bus with one of the given capacity.
    ///
    /// Call before [`Worker::start`] and [`Worker::subscribe`]; receivers
    /// obtained earlier stay attached to the old bus.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus = Bus::new(capacity);
        self
    }

    /// Schedules the execution unit and drives the start handshake.
    ///
    /// Idempotent: a no-op `Ok` when a unit is already scheduled. On
    /// success the execution id is assigned and the run gate has been
    /// released; the first cycle is **not** awaited.
    ///
    /// ### Errors
    /// - [`WorkerError::Scheduling`]: no runtime to schedule onto; the
    ///   handle stays idle.
    /// - [`WorkerError::HandshakeAborted`]: the unit vanished before
    ///   recording its id (abnormal self-termination); the handle stays
    ///   idle.
    pub async fn start(&mut self) -> Result<(), WorkerError> {
        if self.running.is_some() {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|e| WorkerError::Scheduling {
            name: self.name.to_string(),
            reason: e.to_string(),
        })?;

        let interrupt = CancellationToken::new();
        let loop_token = interrupt.child_token();
        let (gate_tx, gate_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);

        let ctx = WorkerContext::new(
            Arc::from(self.name.as_ref()),
            interrupt.clone(),
            loop_token.clone(),
            self.id_slot.clone(),
        );
        let driver = Driver::new(
            self.handler.clone(),
            self.cycle_interval,
            ctx,
            gate_rx,
            state_tx,
            self.bus.clone(),
        );
        let join = runtime.spawn(driver.run());

        // The unit records its id, then leaves Idle. A closed channel here
        // means it died first; surface that instead of gating forever.
        let mut handshake = state_rx.clone();
        if handshake.wait_for(|s| !s.is_idle()).await.is_err() {
            return Err(WorkerError::HandshakeAborted {
                name: self.name.to_string(),
            });
        }

        let _ = gate_tx.send(true);

        self.state_rx = Some(state_rx.clone());
        self.running = Some(Running {
            join,
            interrupt,
            loop_token,
            state: state_rx,
            _gate: gate_tx,
        });
        Ok(())
    }

    /// Signals termination and, when joinable, waits for it.
    ///
    /// No-op on a handle with no scheduled unit. Cancelling the interrupt
    /// token both ends the loop at its next boundary and unblocks a
    /// `cycle` selecting on [`WorkerContext::interrupted`].
    ///
    /// When joinable, the join result is only advisory (it races the
    /// unit's own exit; failures are published and ignored): the return
    /// is gated on the driver's `Terminated` signal, so the caller gets a
    /// strict happens-before edge for resource teardown. When not
    /// joinable, returns immediately after signalling and the unit may
    /// still be winding down.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        self.bus
            .publish(Event::new(EventKind::StopRequested).with_worker(self.name.as_ref()));
        running.interrupt.cancel();

        if !self.joinable {
            return;
        }

        if let Err(err) = running.join.await {
            self.bus.publish(
                Event::new(EventKind::JoinFailed)
                    .with_worker(self.name.as_ref())
                    .with_reason(err.to_string()),
            );
        }

        // Authoritative completion signal; a closed channel means the unit
        // is gone as well.
        let mut state = running.state;
        let _ = state.wait_for(|s| s.is_terminated()).await;
    }

    /// Ends looping after the current cycle, without interrupt or join.
    ///
    /// The unit still drains through `on_stop` on its own; the handle
    /// stays scheduled until [`Worker::stop`] resets it.
    pub fn request_stop(&self) {
        if let Some(running) = &self.running {
            self.bus
                .publish(Event::new(EventKind::StopRequested).with_worker(self.name.as_ref()));
            running.loop_token.cancel();
        }
    }

    /// `true` while the owner wants the unit to keep looping.
    pub fn can_loop(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.loop_token.is_cancelled())
    }

    /// `true` while a unit is scheduled and not yet reset by `stop()`.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Execution id of the most recently scheduled unit.
    ///
    /// [`ExecutionId::UNASSIGNED`] before the first successful `start()`;
    /// stays readable across `stop()`.
    pub fn id(&self) -> ExecutionId {
        ExecutionId::from_raw(self.id_slot.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Last observed driver state; [`WorkerState::Idle`] before the first
    /// start.
    pub fn state(&self) -> WorkerState {
        self.state_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(WorkerState::Idle)
    }

    /// Diagnostic worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// New receiver for the lifecycle event feed.
    ///
    /// Subscribe before `start()` to observe the handshake events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The event bus this worker publishes on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.interrupt.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    use async_trait::async_trait;
    use tokio::time;

    use crate::error::CycleError;
    use crate::events::HookStage;
    use crate::handlers::{CycleFn, CycleHandler};

    /// Records every hook invocation in order.
    struct Probe {
        calls: Mutex<Vec<&'static str>>,
        fail_cycle: bool,
    }

    impl Probe {
        fn new(fail_cycle: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_cycle,
            })
        }

        fn push(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &'static str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
        }
    }

    #[async_trait]
    impl CycleHandler for Probe {
        async fn on_start(&self, _ctx: &WorkerContext) {
            self.push("on_start");
        }

        async fn before_cycle(&self, _ctx: &WorkerContext) -> Result<(), CycleError> {
            self.push("before_cycle");
            Ok(())
        }

        async fn cycle(&self, _ctx: &WorkerContext) -> Result<(), CycleError> {
            self.push("cycle");
            if self.fail_cycle {
                Err(CycleError::fail("boom"))
            } else {
                Ok(())
            }
        }

        async fn after_cycle(&self, _ctx: &WorkerContext) -> Result<(), CycleError> {
            self.push("after_cycle");
            Ok(())
        }

        async fn on_stop(&self, _ctx: &WorkerContext) {
            self.push("on_stop");
        }
    }

    fn counting_handler() -> (HandlerRef, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let seen = count.clone();
        let handler = CycleFn::arc(move |_ctx| {
            let count = seen.clone();
            async move {
                count.fetch_add(1, AtomicOrdering::Relaxed);
                tokio::task::yield_now().await;
                Ok::<_, CycleError>(())
            }
        });
        (handler, count)
    }

    #[tokio::test]
    async fn test_id_is_assigned_once_start_returns() {
        let (handler, _count) = counting_handler();
        let mut worker = Worker::new("ids", handler, Duration::from_millis(10), true);
        assert_eq!(worker.id(), ExecutionId::UNASSIGNED);

        worker.start().await.expect("start succeeds");
        assert!(worker.id().is_assigned());
        assert!(worker.is_running());
        assert!(worker.can_loop());

        worker.stop().await;
        // The id survives the reset to idle.
        assert!(worker.id().is_assigned());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_noop() {
        let (handler, count) = counting_handler();
        let mut worker = Worker::new("noop", handler, Duration::ZERO, true);

        worker.stop().await;

        assert!(!worker.is_running());
        assert!(!worker.can_loop());
        assert!(worker.state().is_idle());
        assert_eq!(count.load(AtomicOrdering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_double_start_schedules_a_single_unit() {
        let probe = Probe::new(false);
        let mut worker = Worker::new("twice", probe.clone(), Duration::from_millis(10), true);

        worker.start().await.expect("first start succeeds");
        let id = worker.id();
        worker.start().await.expect("second start is a no-op");

        assert_eq!(worker.id(), id);
        worker.stop().await;
        assert_eq!(probe.count("on_start"), 1);
        assert_eq!(probe.count("on_stop"), 1);
    }

    #[tokio::test]
    async fn test_stop_right_after_start_runs_zero_cycles() {
        let probe = Probe::new(false);
        let mut worker = Worker::new("early", probe.clone(), Duration::from_millis(10), true);

        worker.start().await.expect("start succeeds");
        worker.stop().await;

        // Drained without a single loop iteration; on_stop still ran once.
        assert_eq!(probe.calls(), vec!["on_start", "on_stop"]);
        assert!(worker.state().is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_joinable_stop_confirms_termination() {
        let probe = Probe::new(false);
        let mut worker = Worker::new("join", probe.clone(), Duration::from_millis(1), true);

        worker.start().await.expect("start succeeds");
        time::sleep(Duration::from_millis(5)).await;
        worker.stop().await;

        assert!(worker.state().is_terminated());
        assert!(!worker.is_running());
        assert_eq!(probe.count("on_stop"), 1);

        // No further hook calls after stop returned.
        let settled = probe.calls().len();
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(probe.calls().len(), settled);
    }

    #[tokio::test]
    async fn test_zero_interval_skips_the_sleep() {
        let (handler, count) = counting_handler();
        let mut worker = Worker::new("hot", handler, Duration::ZERO, true);

        worker.start().await.expect("start succeeds");
        time::sleep(Duration::from_millis(50)).await;
        worker.stop().await;

        // Far above anything an interval-paced loop could reach.
        assert!(
            count.load(AtomicOrdering::Relaxed) >= 100,
            "hot loop ran only {} iterations",
            count.load(AtomicOrdering::Relaxed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_failures_do_not_stop_the_loop() {
        let probe = Probe::new(true);
        let mut worker = Worker::new("faulty", probe.clone(), Duration::from_millis(1), true);

        worker.start().await.expect("start succeeds");
        while probe.count("cycle") < 5 {
            time::sleep(Duration::from_millis(1)).await;
        }
        worker.stop().await;

        assert!(probe.count("cycle") >= 5);
        assert_eq!(probe.count("on_stop"), 1);
        assert!(worker.state().is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_cycle_call_order() {
        let probe = Probe::new(true);
        let mut worker = Worker::new("order", probe.clone(), Duration::from_millis(1), true);

        worker.start().await.expect("start succeeds");
        while probe.count("cycle") < 3 {
            time::sleep(Duration::from_millis(1)).await;
        }
        worker.stop().await;

        let calls = probe.calls();
        assert_eq!(calls.first(), Some(&"on_start"));
        assert_eq!(calls.last(), Some(&"on_stop"));

        // A failing cycle skips after_cycle, so the middle is exact
        // (before_cycle, cycle) pairs.
        let middle = &calls[1..calls.len() - 1];
        assert!(!middle.is_empty());
        assert_eq!(middle.len() % 2, 0);
        for pair in middle.chunks_exact(2) {
            assert_eq!(pair, ["before_cycle", "cycle"]);
        }
        assert_eq!(probe.count("after_cycle"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_cycle_call_order() {
        let probe = Probe::new(false);
        let mut worker = Worker::new("order-ok", probe.clone(), Duration::from_millis(1), true);

        worker.start().await.expect("start succeeds");
        while probe.count("cycle") < 3 {
            time::sleep(Duration::from_millis(1)).await;
        }
        worker.stop().await;

        let calls = probe.calls();
        assert_eq!(calls.first(), Some(&"on_start"));
        assert_eq!(calls.last(), Some(&"on_stop"));

        let middle = &calls[1..calls.len() - 1];
        assert_eq!(middle.len() % 3, 0);
        for triple in middle.chunks_exact(3) {
            assert_eq!(triple, ["before_cycle", "cycle", "after_cycle"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_bounds_the_iteration_rate() {
        let count = Arc::new(AtomicU64::new(0));
        let seen = count.clone();
        let handler = CycleFn::arc(move |_ctx| {
            let count = seen.clone();
            async move {
                count.fetch_add(1, AtomicOrdering::Relaxed);
                Ok::<_, CycleError>(())
            }
        });
        let mut worker = Worker::new("paced", handler, Duration::from_millis(50), true);

        worker.start().await.expect("start succeeds");
        time::sleep(Duration::from_millis(220)).await;
        worker.stop().await;

        let iterations = count.load(AtomicOrdering::Relaxed);
        assert!(
            (3..=5).contains(&iterations),
            "expected 3..=5 iterations at 50ms over 220ms, got {iterations}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_stop_from_inside_a_cycle() {
        let count = Arc::new(AtomicU64::new(0));
        let seen = count.clone();
        let handler = CycleFn::arc(move |ctx: WorkerContext| {
            let count = seen.clone();
            async move {
                count.fetch_add(1, AtomicOrdering::Relaxed);
                ctx.request_stop();
                Ok::<_, CycleError>(())
            }
        });
        let mut worker = Worker::new("self-stop", handler, Duration::from_millis(5), true);

        worker.start().await.expect("start succeeds");
        while !worker.state().is_terminated() {
            time::sleep(Duration::from_millis(1)).await;
        }

        // Exactly one cycle ran; the handle stays scheduled until stop.
        assert_eq!(count.load(AtomicOrdering::Relaxed), 1);
        assert!(worker.is_running());
        assert!(!worker.can_loop());

        worker.stop().await;
        assert!(!worker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_a_blocked_cycle() {
        struct Blocked;

        #[async_trait]
        impl CycleHandler for Blocked {
            async fn cycle(&self, ctx: &WorkerContext) -> Result<(), CycleError> {
                ctx.interrupted().await;
                Err(CycleError::Interrupted)
            }
        }

        let mut worker = Worker::new("blocked", Arc::new(Blocked), Duration::ZERO, true);
        worker.start().await.expect("start succeeds");
        time::sleep(Duration::from_millis(5)).await;

        // Joinable stop returns promptly because the interrupt unblocks
        // the pending cycle.
        worker.stop().await;
        assert!(worker.state().is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_panic_is_contained() {
        struct Panicky {
            attempts: AtomicU64,
        }

        #[async_trait]
        impl CycleHandler for Panicky {
            async fn cycle(&self, _ctx: &WorkerContext) -> Result<(), CycleError> {
                self.attempts.fetch_add(1, AtomicOrdering::Relaxed);
                panic!("cycle blew up");
            }
        }

        let handler = Arc::new(Panicky {
            attempts: AtomicU64::new(0),
        });
        let mut worker = Worker::new("panicky", handler.clone(), Duration::from_millis(1), true);
        let mut rx = worker.subscribe();

        worker.start().await.expect("start succeeds");
        while handler.attempts.load(AtomicOrdering::Relaxed) < 3 {
            time::sleep(Duration::from_millis(1)).await;
        }
        worker.stop().await;

        // The loop survived repeated panics and still drained cleanly.
        assert!(handler.attempts.load(AtomicOrdering::Relaxed) >= 3);
        assert!(worker.state().is_terminated());

        let mut saw_panic_event = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::HookPanicked {
                assert_eq!(ev.stage, Some(HookStage::Cycle));
                assert_eq!(ev.reason.as_deref(), Some("cycle blew up"));
                saw_panic_event = true;
            }
        }
        assert!(saw_panic_event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_feed_reports_the_lifecycle_in_order() {
        let probe = Probe::new(false);
        let mut worker = Worker::new("events", probe.clone(), Duration::from_millis(1), true)
            .with_bus_capacity(128);
        let mut rx = worker.subscribe();

        worker.start().await.expect("start succeeds");
        while probe.count("cycle") < 1 {
            time::sleep(Duration::from_millis(1)).await;
        }
        worker.stop().await;

        let mut kinds = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(ev) => {
                    assert_eq!(ev.worker.as_deref(), Some("events"));
                    kinds.push(ev.kind);
                    if ev.kind == EventKind::Terminated {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        let pos = |kind: EventKind| kinds.iter().position(|k| *k == kind);
        let handshake = pos(EventKind::HandshakeEntered).expect("handshake event");
        let looping = pos(EventKind::LoopEntered).expect("loop event");
        let stop = pos(EventKind::StopRequested).expect("stop event");
        let draining = pos(EventKind::Draining).expect("drain event");
        let terminated = pos(EventKind::Terminated).expect("terminated event");
        assert!(handshake < looping);
        assert!(looping < stop);
        assert!(stop < draining);
        assert!(draining < terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_signals_the_unit_to_drain() {
        let probe = Probe::new(false);
        {
            let mut worker = Worker::new("dropped", probe.clone(), Duration::from_millis(1), true);
            worker.start().await.expect("start succeeds");
            time::sleep(Duration::from_millis(3)).await;
        }

        // The dropped handle cancelled the unit; it drains on its own.
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(probe.count("on_stop"), 1);
    }

    #[test]
    fn test_start_outside_a_runtime_fails_with_scheduling_error() {
        let handler = CycleFn::arc(|_ctx| async { Ok::<_, CycleError>(()) });
        let mut worker = Worker::new("offline", handler, Duration::ZERO, true);

        let err = futures::executor::block_on(worker.start()).unwrap_err();
        assert_eq!(err.as_label(), "worker_scheduling");
        assert!(!worker.is_running());
        assert!(worker.state().is_idle());
    }
}
