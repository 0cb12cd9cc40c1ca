//! # Example: peer_close
//!
//! Shows the failure policy of the cycle loop: errors are reported and
//! retried, never escalated, and an expected peer-initiated close is kept
//! quiet while other failures are not.
//!
//! Demonstrates how to:
//! - Attach the built-in [`LogWriter`] to the event feed.
//! - Return [`CycleError::GracefulClose`] vs a plain failure from `cycle`.
//! - Watch the loop keep retrying until `stop()`.
//!
//! ## Run
//! ```bash
//! cargo run --example peer_close --features logging
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cyclevisor::{CycleError, CycleFn, LogWriter, Worker};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();

    // Every odd attempt fails hard, every even one looks like the peer
    // hanging up; neither ends the loop.
    let handler = CycleFn::arc(move |_ctx| {
        let attempts = seen.clone();
        async move {
            let n = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 2 == 1 {
                Err(CycleError::fail(format!("read failed on attempt {n}")))
            } else {
                Err(CycleError::GracefulClose)
            }
        }
    });

    let mut worker = Worker::new("flaky-peer", handler, Duration::from_millis(300), true);
    LogWriter::attach(worker.bus());

    worker.start().await?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    worker.stop().await;

    println!(
        "[main] loop survived {} failing attempts",
        attempts.load(Ordering::Relaxed)
    );
    Ok(())
}
