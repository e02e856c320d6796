//! # Tether
//!
//! Lifecycle-scoped tracking and cancellation of in-flight async operations.
//!
//! An owner (a UI component, a connection handler, a session) registers the
//! futures it spawns with a [`Tracker`](track::Tracker). Each registered
//! operation is wrapped so that its settlement automatically removes it from
//! the tracker's store, and a one-time teardown cancels everything still
//! outstanding:
//!
//! - **Automatic bookkeeping**: settled operations remove themselves from the
//!   store on the same poll that observes settlement
//! - **Cooperative cancellation**: cancelling an operation suppresses its
//!   downstream continuation without preempting the computation
//! - **One-shot teardown**: cancels every outstanding operation and clears all
//!   scheduled timers
//! - **Event-driven observability**: pluggable event sinks for monitoring
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether::prelude::*;
//!
//! let tracker = Tracker::new();
//!
//! // Wrap an in-flight operation; the store forgets it once it settles.
//! let tracked = tracker.register(fetch_profile(user_id));
//! match tracked.await {
//!     Ok(profile) => render(profile),
//!     Err(Cancelled) => {} // torn down mid-flight, nothing to render
//! }
//!
//! // When the owner goes away, sever everything still outstanding.
//! tracker.teardown();
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod errors;
pub mod events;
pub mod testing;
pub mod track;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::{Cancelled, TetherError};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, TrackerEvent,
    };
    pub use crate::track::{Canceller, Handle, TimerId, Tracked, Tracker};
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
