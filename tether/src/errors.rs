//! Error types for tether.
//!
//! The tracker itself never fails: the only consumer-facing outcome beyond
//! success is [`Cancelled`], the distinguished settlement of a tracked
//! operation whose continuation was suppressed. An underlying operation's own
//! failure value passes through the wrapper unchanged.

use thiserror::Error;

/// The outcome of a tracked operation that was cancelled before it settled.
///
/// Cancellation is not a failure of the tracker; it is the wrapper resolving
/// without the inner value. The inner computation may still be running, but
/// its result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled before settlement")]
pub struct Cancelled;

/// The main error type for tether operations.
///
/// Provided for consumers that funnel tracked outcomes into a single error
/// type; the tracker's own API only ever produces [`Cancelled`].
#[derive(Debug, Error)]
pub enum TetherError {
    /// The tracked operation was cancelled before settlement.
    #[error("{0}")]
    Cancelled(#[from] Cancelled),

    /// The tracker has already been torn down.
    #[error("tracker already torn down")]
    Closed,
}
