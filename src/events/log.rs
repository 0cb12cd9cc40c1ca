//! # LogWriter: simple event printer
//!
//! A minimal listener that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [handshake] worker="ticker" id=1
//! [loop-entered] worker="ticker"
//! [cycle-failed] worker="ticker" stage=cycle cycle=3 err="connection refused"
//! [peer-closed] worker="ticker" cycle=4
//! [stop-requested] worker="ticker"
//! [draining] worker="ticker"
//! [terminated] worker="ticker"
//! ```

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};

/// Event writer listener.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Subscribes to the bus and spawns a task printing every event.
    ///
    /// The task exits when the bus is dropped; lagged windows are skipped.
    pub fn attach(bus: &Bus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => Self::write(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn write(e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::HandshakeEntered => {
                println!(
                    "[handshake] worker={:?} id={}",
                    worker,
                    e.execution_id.unwrap_or(-1)
                );
            }
            EventKind::LoopEntered => {
                println!("[loop-entered] worker={:?}", worker);
            }
            EventKind::Draining => {
                println!("[draining] worker={:?}", worker);
            }
            EventKind::Terminated => {
                println!("[terminated] worker={:?}", worker);
            }
            EventKind::CycleFailed => {
                println!(
                    "[cycle-failed] worker={:?} stage={} cycle={:?} err={:?}",
                    worker,
                    e.stage.map(|s| s.as_label()).unwrap_or("unknown"),
                    e.cycle,
                    e.reason,
                );
            }
            EventKind::PeerClosed => {
                println!("[peer-closed] worker={:?} cycle={:?}", worker, e.cycle);
            }
            EventKind::HookPanicked => {
                println!(
                    "[hook-panicked] worker={:?} stage={} info={:?}",
                    worker,
                    e.stage.map(|s| s.as_label()).unwrap_or("unknown"),
                    e.reason,
                );
            }
            EventKind::StopRequested => {
                println!("[stop-requested] worker={:?}", worker);
            }
            EventKind::JoinFailed => {
                println!("[join-failed] worker={:?} err={:?}", worker, e.reason);
            }
        }
    }
}
