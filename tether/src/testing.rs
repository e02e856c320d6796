//! Test tooling.
//!
//! Provides [`manual`], a deferred future completed externally, used by the
//! crate's own tests to model operations that settle on command (or never).

use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Creates a deferred future and the handle that completes it.
///
/// The future resolves with whatever value is passed to
/// [`ManualHandle::complete`]. If the handle is dropped without completing,
/// the future never settles.
#[must_use]
pub fn manual<T>() -> (ManualHandle<T>, ManualFuture<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        ManualHandle { sender },
        ManualFuture {
            receiver,
            orphaned: false,
        },
    )
}

/// Completes the paired [`ManualFuture`].
#[derive(Debug)]
pub struct ManualHandle<T> {
    sender: oneshot::Sender<T>,
}

impl<T> ManualHandle<T> {
    /// Settles the paired future with `value`.
    pub fn complete(self, value: T) {
        let _ = self.sender.send(value);
    }
}

/// A future settled externally through a [`ManualHandle`].
#[derive(Debug)]
pub struct ManualFuture<T> {
    receiver: oneshot::Receiver<T>,
    orphaned: bool,
}

impl<T> Future for ManualFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.orphaned {
            return Poll::Pending;
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(_dropped)) => {
                // Handle dropped without completing: never settle.
                this.orphaned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
