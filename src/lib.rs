//! # cyclevisor
//!
//! **Cyclevisor** is a lightweight supervised-worker library for Rust.
//!
//! It manages the full lifecycle of one cooperatively-scheduled execution
//! unit (creation, a ready-handshake, a repeating work cycle with hook
//! points, and coordinated shutdown) on behalf of a caller-supplied
//! handler. The crate is designed as a building block for long-running
//! services that need per-connection or per-resource worker loops.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!          ┌──────────────┐
//!          │ CycleHandler │  (user hooks: on_start / before_cycle /
//!          │  (or CycleFn)│   cycle / after_cycle / on_stop)
//!          └──────┬───────┘
//!                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Worker (owner-side handle)                                 │
//! │  - start(): spawn driver, handshake, release run gate       │
//! │  - stop(): interrupt, join, await confirmed termination     │
//! │  - request_stop() / can_loop() / id() / state()             │
//! └──────┬──────────────────────────────────────────────┬───────┘
//!        ▼                                              │
//!   ┌──────────────────────────────┐                    │
//!   │  Driver (spawned unit)       │                    │
//!   │  Handshaking ─► Looping ─►   │                    │
//!   │  Draining ─► Terminated      │                    │
//!   └──────┬───────────────────────┘                    │
//!          │ publishes Events                           │ subscribe()
//!          ▼                                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Bus (broadcast channel)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Worker::start()
//!   ├─► spawn driver onto the tokio runtime
//!   ├─► driver records its ExecutionId, publishes Handshaking
//!   ├─► start() observes the id and releases the run gate
//!   └─► returns Ok (first cycle not awaited)
//!
//! driver loop {
//!   ├─► before_cycle()  ──Err──► report, retry next iteration
//!   ├─► cycle()         ──Err──► report (quiet for peer close), retry
//!   ├─► after_cycle()   ──Err──► report
//!   └─► sleep cycle_interval (skipped when zero; exits early on stop)
//! }
//!
//! Worker::stop()
//!   ├─► cancel the interrupt token (ends the loop, unblocks cycle)
//!   ├─► join the unit (failures published, never trusted alone)
//!   └─► await WorkerState::Terminated (on_stop has fully returned)
//! ```
//!
//! ## Features
//! | Area           | Description                                              | Key types / traits                  |
//! |----------------|----------------------------------------------------------|-------------------------------------|
//! | **Supervision**| Start/stop one repeating worker with strict ordering.    | [`Worker`], [`WorkerState`]         |
//! | **Handlers**   | Define the work as a trait impl or a closure.            | [`CycleHandler`], [`CycleFn`]       |
//! | **Control**    | Cooperative shutdown checks inside hooks.                | [`WorkerContext`]                   |
//! | **Errors**     | Typed errors for scheduling and per-cycle failures.      | [`WorkerError`], [`CycleError`]     |
//! | **Events**     | Lifecycle feed for logging/metrics.                      | [`Event`], [`EventKind`], [`Bus`]   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
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
//!     let beats = Arc::new(AtomicU32::new(0));
//!     let seen = beats.clone();
//!
//!     // A worker that beats three times, then asks to stop itself.
//!     let handler = CycleFn::arc(move |ctx: WorkerContext| {
//!         let beats = seen.clone();
//!         async move {
//!             if beats.fetch_add(1, Ordering::Relaxed) + 1 >= 3 {
//!                 ctx.request_stop();
//!             }
//!             Ok::<_, CycleError>(())
//!         }
//!     });
//!
//!     let mut worker = Worker::new("heartbeat", handler, Duration::from_millis(1), true);
//!     worker.start().await?;
//!     assert!(worker.id().is_assigned());
//!
//!     // Let it run until it asks to stop itself, then tear down.
//!     while worker.can_loop() {
//!         tokio::time::sleep(Duration::from_millis(1)).await;
//!     }
//!     worker.stop().await;
//!     assert_eq!(beats.load(Ordering::Relaxed), 3);
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod handlers;

// ---- Public re-exports ----

pub use self::core::{ExecutionId, Worker, WorkerContext, WorkerState};
pub use error::{CycleError, WorkerError};
pub use events::{Bus, DEFAULT_BUS_CAPACITY, Event, EventKind, HookStage};
pub use handlers::{CycleFn, CycleHandler, HandlerRef};

// Optional: expose a simple built-in event printer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use events::LogWriter;
