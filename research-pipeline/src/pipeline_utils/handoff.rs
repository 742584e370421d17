//! Zero-capacity handoff channel between pipeline stages
//!
//! A send only completes once some receiver has taken the item, so a slow
//! consumer applies backpressure to every producer feeding it. Both ends are
//! cloneable: the work queue fans out to many workers and the result queue
//! fans in from many workers.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Item in transit plus the signal its sender is parked on
struct Envelope<T> {
    item: T,
    accepted: oneshot::Sender<()>,
}

/// Returned when every receiver (or every sender) is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("handoff channel closed")]
pub struct HandoffClosed;

/// Create a zero-capacity handoff channel
pub fn handoff<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    // The single slot only parks an envelope while its sender waits for
    // acceptance; no send returns before a receiver took the item.
    let (tx, rx) = async_channel::bounded(1);
    let drain = Arc::new(DrainOnDrop(rx.clone()));
    (HandoffSender { tx }, HandoffReceiver { rx, _drain: drain })
}

/// Sending half of a handoff channel
pub struct HandoffSender<T> {
    tx: async_channel::Sender<Envelope<T>>,
}

impl<T> HandoffSender<T> {
    /// Hand `item` to a receiver, waiting until one accepts it
    ///
    /// Dropping the returned future before it resolves withdraws the item:
    /// it will not be delivered to anyone.
    pub async fn send(&self, item: T) -> Result<(), HandoffClosed> {
        let (accepted, on_accept) = oneshot::channel();
        self.tx
            .send(Envelope { item, accepted })
            .await
            .map_err(|_| HandoffClosed)?;
        on_accept.await.map_err(|_| HandoffClosed)
    }

    /// True once every receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for HandoffSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving half of a handoff channel
pub struct HandoffReceiver<T> {
    rx: async_channel::Receiver<Envelope<T>>,
    _drain: Arc<DrainOnDrop<T>>,
}

impl<T> HandoffReceiver<T> {
    /// Take the next item, or `None` once every sender is dropped
    pub async fn recv(&self) -> Option<T> {
        loop {
            let Envelope { item, accepted } = self.rx.recv().await.ok()?;
            // Sender stopped waiting: the item was withdrawn
            if accepted.send(()).is_ok() {
                return Some(item);
            }
        }
    }
}

impl<T> Clone for HandoffReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            _drain: Arc::clone(&self._drain),
        }
    }
}

impl<T> fmt::Debug for HandoffReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffReceiver")
            .field("senders", &self.rx.sender_count())
            .finish()
    }
}

/// Dropped with the last receiver: closes the channel and discards any
/// parked envelope so its sender wakes up with `HandoffClosed`.
struct DrainOnDrop<T>(async_channel::Receiver<Envelope<T>>);

impl<T> Drop for DrainOnDrop<T> {
    fn drop(&mut self) {
        self.0.close();
        while self.0.try_recv().is_ok() {}
    }
}
