//! Tracked operations and their cancel handles.

use super::{Handle, HandleStore};
use crate::errors::Cancelled;
use crate::events::{EventSink, TrackerEvent};
use futures::future::{AbortHandle, Abortable};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

/// A registered operation returned by [`Tracker::register`](super::Tracker::register).
///
/// Resolves to `Ok` with the inner operation's output, or `Err(Cancelled)` if
/// the operation was cancelled (individually or by teardown) before it
/// settled. Settlement removes the operation's store entry on the same poll
/// that observes it.
pub struct Tracked<F: Future> {
    inner: Pin<Box<Abortable<F>>>,
    handle: Handle,
    store: Arc<HandleStore>,
    sink: Arc<dyn EventSink>,
    canceller: Canceller,
}

impl<F: Future> Tracked<F> {
    pub(crate) fn new(
        inner: Abortable<F>,
        handle: Handle,
        abort: AbortHandle,
        store: Arc<HandleStore>,
        sink: Arc<dyn EventSink>,
        cancelled: bool,
    ) -> Self {
        let canceller = Canceller {
            handle,
            abort,
            store: Arc::clone(&store),
            sink: Arc::clone(&sink),
            cancelled: Arc::new(AtomicBool::new(cancelled)),
        };
        Self {
            inner: Box::pin(inner),
            handle,
            store,
            sink,
            canceller,
        }
    }

    /// Returns the handle assigned to this operation.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Returns a cancel handle for this operation.
    ///
    /// The canceller is clonable and can outlive the tracked future itself.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }
}

impl<F: Future> Future for Tracked<F> {
    type Output = Result<F::Output, Cancelled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.inner.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(value)) => {
                // Settlement and removal happen on the same poll.
                if this.store.remove(this.handle) {
                    this.sink
                        .try_emit(TrackerEvent::OperationSettled { handle: this.handle });
                }
                Poll::Ready(Ok(value))
            }
            Poll::Ready(Err(_aborted)) => {
                // The cancelling side already removed the store entry.
                Poll::Ready(Err(Cancelled))
            }
        }
    }
}

impl<F: Future> std::fmt::Debug for Tracked<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked")
            .field("handle", &self.handle)
            .field("cancelled", &self.canceller.is_cancelled())
            .finish()
    }
}

/// Cancel handle for one tracked operation.
///
/// Cancelling removes the operation's store entry and suppresses its
/// downstream continuation: the [`Tracked`] future resolves to
/// `Err(Cancelled)` and never to the inner value, even if the inner
/// operation settles afterwards. Cancelling twice, or after natural
/// settlement, is a no-op.
#[derive(Clone)]
pub struct Canceller {
    handle: Handle,
    abort: AbortHandle,
    store: Arc<HandleStore>,
    sink: Arc<dyn EventSink>,
    cancelled: Arc<AtomicBool>,
}

impl Canceller {
    /// Cancels the operation. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let removed = self.store.remove(self.handle);
        self.abort.abort();
        if removed {
            debug!(handle = %self.handle, "operation cancelled");
            self.sink
                .try_emit(TrackerEvent::OperationCancelled { handle: self.handle });
        }
    }

    /// Returns the handle of the operation this canceller controls.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Returns true once [`cancel`](Self::cancel) has been invoked.
    ///
    /// Reports whether cancellation was requested through this canceller (or
    /// a clone of it), not whether the operation settled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Canceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canceller")
            .field("handle", &self.handle)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
