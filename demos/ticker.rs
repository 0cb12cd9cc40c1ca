//! # Example: ticker
//!
//! Minimal example of a periodic worker driven by a [`CycleHandler`] impl.
//!
//! Demonstrates how to:
//! - Implement the hook trait with `on_start`/`cycle`/`on_stop`.
//! - Start a worker and observe its execution id.
//! - Stop it with confirmed termination (`joinable = true`).
//!
//! ## Flow
//! ```text
//! Worker::start()
//!     ├─► driver records ExecutionId, publishes Handshaking
//!     ├─► on_start
//!     └─► loop: cycle ── sleep 500ms ── cycle ── ...
//! Worker::stop()
//!     ├─► loop exits at the next boundary
//!     ├─► on_stop
//!     └─► Terminated (stop() returns)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example ticker
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cyclevisor::{CycleError, CycleHandler, Worker, WorkerContext};

struct Ticker {
    ticks: AtomicU32,
}

#[async_trait]
impl CycleHandler for Ticker {
    async fn on_start(&self, ctx: &WorkerContext) {
        println!("[ticker] started as execution {}", ctx.id());
    }

    async fn cycle(&self, ctx: &WorkerContext) -> Result<(), CycleError> {
        if !ctx.can_loop() {
            return Ok(());
        }
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[ticker] tick {n}");
        Ok(())
    }

    async fn on_stop(&self, _ctx: &WorkerContext) {
        println!("[ticker] stopped after {} ticks", self.ticks.load(Ordering::Relaxed));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let handler = Arc::new(Ticker {
        ticks: AtomicU32::new(0),
    });

    // One tick every 500ms; stop() waits for confirmed termination.
    let mut worker = Worker::new("ticker", handler, Duration::from_millis(500), true);
    worker.start().await?;
    println!("[main] worker {} is running", worker.id());

    tokio::time::sleep(Duration::from_secs(3)).await;

    worker.stop().await;
    println!("[main] worker fully terminated");
    Ok(())
}
