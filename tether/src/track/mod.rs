//! Operation tracking and structured cancellation.
//!
//! This module provides:
//! - `Tracker` for registering in-flight operations against one owner
//! - `Tracked` wrapped futures that unregister themselves on settlement
//! - `Canceller` handles for cancelling a single operation
//! - A scheduled-timer registry cleared in full on teardown

mod handle;
mod operation;
mod store;
mod timers;
mod tracker;

pub use handle::Handle;
pub use operation::{Canceller, Tracked};
pub use timers::TimerId;
pub use tracker::Tracker;

pub(crate) use store::HandleStore;
pub(crate) use timers::TimerRegistry;
