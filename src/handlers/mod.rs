//! Handler abstractions: the hook trait and a function-backed shortcut.
//!
//! - [`CycleHandler`]: the capability interface the driver calls into;
//! - [`CycleFn`]: closure-backed handler for workers that only need `cycle`;
//! - [`HandlerRef`]: shared handle type (`Arc<dyn CycleHandler>`).

mod cycle_fn;
mod handler;

pub use cycle_fn::CycleFn;
pub use handler::{CycleHandler, HandlerRef};
