//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the worker handle and
//! the cycle driver.
//!
//! - [`Event`] / [`EventKind`] / [`HookStage`]: what happened, where, why;
//! - [`Bus`]: bounded broadcast channel carrying the events;
//! - [`LogWriter`] (feature `logging`): a demo printer for the feed.

mod bus;
mod event;

pub use bus::{Bus, DEFAULT_BUS_CAPACITY};
pub use event::{Event, EventKind, HookStage};

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
