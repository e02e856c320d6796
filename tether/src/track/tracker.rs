//! The tracker owning one store of in-flight operations.

use super::{Handle, HandleStore, TimerId, TimerRegistry, Tracked};
use crate::events::{EventSink, NoOpEventSink, TrackerEvent};
use futures::future::{AbortHandle, Abortable};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

struct TrackerInner {
    store: Arc<HandleStore>,
    timers: Arc<TimerRegistry>,
    sink: Arc<dyn EventSink>,
}

/// Tracks in-flight async operations for one owner and cancels whatever is
/// still outstanding at teardown.
///
/// Cheaply clonable; clones share the same store. Each owner instance should
/// hold its own tracker, since stores are never shared across owners.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl Tracker {
    /// Creates a tracker with no event sink.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NoOpEventSink))
    }

    /// Creates a tracker that emits lifecycle events to the given sink.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                store: Arc::new(HandleStore::new()),
                timers: Arc::new(TimerRegistry::new()),
                sink,
            }),
        }
    }

    /// Registers an in-flight operation.
    ///
    /// The operation is assigned a fresh handle and inserted into the store;
    /// the returned [`Tracked`] future removes the entry when it observes
    /// settlement, and yields `Err(Cancelled)` instead of the inner value if
    /// the operation is cancelled first.
    ///
    /// After teardown the returned operation starts cancelled: it resolves
    /// `Err(Cancelled)` without the inner future ever being polled.
    pub fn register<F: Future>(&self, operation: F) -> Tracked<F> {
        let (abort, registration) = AbortHandle::new_pair();
        let wrapped = Abortable::new(operation, registration);

        if let Some(handle) = self.inner.store.insert(abort.clone()) {
            debug!(handle = %handle, "operation registered");
            self.inner
                .sink
                .try_emit(TrackerEvent::OperationRegistered { handle });
            Tracked::new(
                wrapped,
                handle,
                abort,
                Arc::clone(&self.inner.store),
                Arc::clone(&self.inner.sink),
                false,
            )
        } else {
            // No handle is allocated for a refused registration.
            let handle = self.inner.store.next_handle();
            warn!(handle = %handle, "register() called after teardown; operation starts cancelled");
            abort.abort();
            Tracked::new(
                wrapped,
                handle,
                abort,
                Arc::clone(&self.inner.store),
                Arc::clone(&self.inner.sink),
                true,
            )
        }
    }

    /// Schedules `callback` to run once after `delay`.
    ///
    /// Scheduled timers live in their own registry and are cleared in full at
    /// teardown. After teardown the callback never runs.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.store.is_closed() {
            let id = self.inner.timers.next_id();
            warn!(timer = %id, "schedule() called after teardown; timer not scheduled");
            return id;
        }
        let id = self.inner.timers.schedule(delay, callback);
        debug!(timer = %id, delay = ?delay, "timer scheduled");
        self.inner
            .sink
            .try_emit(TrackerEvent::TimerScheduled { timer: id });
        id
    }

    /// Aborts one scheduled timer. Returns true if it was still pending.
    pub fn clear_timer(&self, id: TimerId) -> bool {
        let cleared = self.inner.timers.clear(id);
        if cleared {
            self.inner
                .sink
                .try_emit(TrackerEvent::TimerCleared { timer: id });
        }
        cleared
    }

    /// Tears the tracker down: cancels every outstanding operation and clears
    /// every pending timer.
    ///
    /// The store is closed and its entries snapshotted as one atomic step
    /// under the store lock, then each entry is aborted outside the lock, in
    /// arbitrary order. A registration racing this call either lands before
    /// the close and is cancelled here, or is refused by the closed store.
    /// Entries that already settled or were cancelled are absent from the
    /// snapshot and are not cancelled again. Idempotent: a second call is a
    /// no-op.
    pub fn teardown(&self) {
        let Some(outstanding) = self.inner.store.close_and_drain() else {
            debug!("teardown already performed");
            return;
        };

        let cancelled = outstanding.len();
        for (handle, abort) in outstanding {
            abort.abort();
            self.inner
                .sink
                .try_emit(TrackerEvent::OperationCancelled { handle });
        }

        let timers_cleared = self.inner.timers.clear_all();

        debug!(cancelled, timers_cleared, "tracker torn down");
        self.inner.sink.try_emit(TrackerEvent::TrackerTeardown {
            cancelled,
            timers_cleared,
        });
    }

    /// Returns the number of outstanding operations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns true if the handle has an outstanding entry.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.inner.store.contains(handle)
    }

    /// Returns the number of pending timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.pending_count()
    }

    /// Returns true once the tracker has been torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.store.is_closed()
    }

    /// Peeks at the next handle the counter will assign.
    #[must_use]
    pub fn next_handle(&self) -> Handle {
        self.inner.store.next_handle()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("pending", &self.pending_count())
            .field("pending_timers", &self.pending_timers())
            .field("closed", &self.is_closed())
            .finish()
    }
}
