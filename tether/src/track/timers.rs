//! Scheduled-timer registry.
//!
//! A second collection alongside the operation store, with its own monotonic
//! counter and no interaction with tracked operations. Teardown clears it in
//! full so no pending callback fires after the owner is gone.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Identifier for one scheduled timer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    /// Returns the raw counter value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct TimerState {
    next: u64,
    entries: HashMap<TimerId, JoinHandle<()>>,
}

/// Per-tracker registry of scheduled timers.
#[derive(Default)]
pub(crate) struct TimerRegistry {
    state: Mutex<TimerState>,
}

impl TimerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` to run once after `delay` on the tokio runtime.
    ///
    /// The spawned task removes its own entry after firing. The lock is held
    /// across the spawn so the task cannot observe its own completion before
    /// the entry exists.
    pub(crate) fn schedule<F>(self: &Arc<Self>, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        let id = TimerId(state.next);
        state.next += 1;

        let registry = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        });
        state.entries.insert(id, task);
        id
    }

    /// Removes an entry without aborting it. Idempotent.
    pub(crate) fn remove(&self, id: TimerId) -> bool {
        self.state.lock().entries.remove(&id).is_some()
    }

    /// Aborts and removes one timer. Returns true if it was still pending.
    pub(crate) fn clear(&self, id: TimerId) -> bool {
        let task = self.state.lock().entries.remove(&id);
        match task {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts and removes every pending timer. Returns how many were cleared.
    pub(crate) fn clear_all(&self) -> usize {
        let entries: Vec<(TimerId, JoinHandle<()>)> = {
            let mut state = self.state.lock();
            state.entries.drain().collect()
        };
        let cleared = entries.len();
        for (_, task) in entries {
            task.abort();
        }
        cleared
    }

    /// Peeks at the next timer id the counter will assign.
    pub(crate) fn next_id(&self) -> TimerId {
        TimerId(self.state.lock().next)
    }

    /// Returns the number of pending timers.
    pub(crate) fn pending_count(&self) -> usize {
        self.state.lock().entries.len()
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("pending", &self.pending_count())
            .finish()
    }
}
