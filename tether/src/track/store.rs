//! Bookkeeping store mapping handles to abort handles.

use super::Handle;
use futures::future::AbortHandle;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Counter, closed flag, and entry map, kept under one lock so that assigning
/// a handle and inserting its entry is a single atomic step, and so that an
/// insert can never slip in between closing and draining.
#[derive(Default)]
struct StoreState {
    /// The next handle to assign. Starts at 0, incremented by exactly 1 on
    /// every insertion, never reset.
    next: u64,
    /// Set once by `close_and_drain`; refuses further insertions.
    closed: bool,
    /// Outstanding operations. Every key corresponds to an operation that has
    /// neither settled nor been cancelled.
    entries: HashMap<Handle, AbortHandle>,
}

/// Per-tracker store of outstanding operations.
///
/// Entries are removed synchronously by whoever observes settlement or
/// cancellation; teardown closes and drains a snapshot under one lock
/// acquisition, so a racing insert either lands before the close and is
/// drained, or is refused.
#[derive(Default)]
pub(crate) struct HandleStore {
    state: Mutex<StoreState>,
}

impl HandleStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Assigns a fresh handle and inserts the abort handle under it.
    ///
    /// Returns `None` without consuming a handle if the store is closed.
    pub(crate) fn insert(&self, abort: AbortHandle) -> Option<Handle> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let handle = Handle(state.next);
        state.next += 1;
        state.entries.insert(handle, abort);
        Some(handle)
    }

    /// Removes an entry. Idempotent; returns true if an entry was removed.
    pub(crate) fn remove(&self, handle: Handle) -> bool {
        self.state.lock().entries.remove(&handle).is_some()
    }

    /// Returns true if the handle has an outstanding entry.
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.state.lock().entries.contains_key(&handle)
    }

    /// Returns the number of outstanding entries.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if no entries are outstanding.
    pub(crate) fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Peeks at the next handle the counter will assign.
    pub(crate) fn next_handle(&self) -> Handle {
        Handle(self.state.lock().next)
    }

    /// Closes the store and snapshots-then-clears all entries, as one atomic
    /// step under the lock.
    ///
    /// Returns `None` if the store was already closed.
    pub(crate) fn close_and_drain(&self) -> Option<Vec<(Handle, AbortHandle)>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.closed = true;
        Some(state.entries.drain().collect())
    }

    /// Returns true once the store has been closed.
    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl std::fmt::Debug for HandleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleStore")
            .field("outstanding", &self.len())
            .field("next_handle", &self.next_handle())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Barrier};

    fn abort_handle() -> AbortHandle {
        let (handle, _registration) = AbortHandle::new_pair();
        handle
    }

    #[test]
    fn test_insert_assigns_sequential_handles() {
        let store = HandleStore::new();
        for expected in 0..5 {
            let handle = store.insert(abort_handle()).unwrap();
            assert_eq!(handle.value(), expected);
        }
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_counter_survives_interleaved_removals() {
        let store = HandleStore::new();
        let first = store.insert(abort_handle()).unwrap();
        store.remove(first);
        let second = store.insert(abort_handle()).unwrap();
        store.remove(second);
        let third = store.insert(abort_handle()).unwrap();

        // Handles are never reused.
        assert_eq!(
            vec![first.value(), second.value(), third.value()],
            vec![0, 1, 2]
        );
        assert_eq!(store.next_handle().value(), 3);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = HandleStore::new();
        let handle = store.insert(abort_handle()).unwrap();

        assert!(store.remove(handle));
        assert!(!store.remove(handle));
        assert!(!store.contains(handle));
    }

    #[test]
    fn test_close_and_drain_snapshots_and_clears() {
        let store = HandleStore::new();
        for _ in 0..3 {
            store.insert(abort_handle()).unwrap();
        }

        let drained = store.close_and_drain().unwrap();
        assert_eq!(drained.len(), 3);
        assert!(store.is_empty());

        // Counter is unaffected by draining.
        assert_eq!(store.next_handle().value(), 3);
    }

    #[test]
    fn test_insert_refused_after_close() {
        let store = HandleStore::new();
        store.close_and_drain().unwrap();

        assert!(store.insert(abort_handle()).is_none());
        assert_eq!(store.len(), 0);
        // A refused insertion consumes no handle.
        assert_eq!(store.next_handle().value(), 0);
    }

    #[test]
    fn test_close_and_drain_first_call_only() {
        let store = HandleStore::new();
        assert!(!store.is_closed());
        assert!(store.close_and_drain().is_some());
        assert!(store.close_and_drain().is_none());
        assert!(store.is_closed());
    }

    #[test]
    fn test_close_excludes_racing_inserts() {
        // Inserts racing the close either land before it and come out of the
        // drain, or are refused; no entry may survive in a closed store.
        for _ in 0..200 {
            let store = Arc::new(HandleStore::new());
            let barrier = Arc::new(Barrier::new(3));

            let mut inserters = Vec::new();
            for _ in 0..2 {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                inserters.push(std::thread::spawn(move || {
                    barrier.wait();
                    store.insert(abort_handle()).is_some()
                }));
            }

            let closer_store = Arc::clone(&store);
            let closer_barrier = Arc::clone(&barrier);
            let closer = std::thread::spawn(move || {
                closer_barrier.wait();
                closer_store.close_and_drain().map_or(0, |drained| drained.len())
            });

            let landed = inserters
                .into_iter()
                .map(|thread| thread.join().unwrap())
                .filter(|landed| *landed)
                .count();
            let drained = closer.join().unwrap();

            assert_eq!(landed, drained);
            assert!(store.is_closed());
            assert!(store.is_empty());
        }
    }
}
