//! Fan-out of serialized snapshots to every live subscriber.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Serialized message shared by every subscriber.
pub type Payload = Arc<str>;
type Channel = mpsc::Sender<Payload>;

/// How many undelivered snapshots a subscriber may fall behind before it is
/// treated as disconnected.
const BACKLOG: usize = 32;

#[derive(Default)]
pub struct Hub {
    subscribers: DashMap<u64, Channel>,
    next_id: AtomicU64,
}

impl Hub {
    /// Registers a new subscriber whose first message is `initial`.
    pub fn subscribe(self: &Arc<Self>, initial: Payload) -> Subscription {
        let (tx, rx) = mpsc::channel(BACKLOG);
        // The receiver is alive and the buffer is empty.
        let _ = tx.try_send(initial);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        assert!(self.subscribers.insert(id, tx).is_none());
        log::debug!("subscriber {id} connected ({} live)", self.subscribers.len());
        Subscription { id, hub: Arc::clone(self), rx }
    }

    /// Removes a subscriber. Unknown IDs are ignored.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            log::debug!("subscriber {id} disconnected");
        }
        removed
    }

    /// Delivers the payload to every subscriber and returns how many received
    /// it. Subscribers that cannot take the payload are dropped on the spot;
    /// the rest still receive it.
    pub fn publish(&self, payload: &Payload) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|id, tx| match tx.try_send(Arc::clone(payload)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(err) => {
                log::warn!("dropping subscriber {id}: {err}");
                false
            }
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Receiving end of one subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    hub: Arc<Hub>,
    rx: mpsc::Receiver<Payload>,
}

impl Subscription {
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next payload. Yields `None` once the hub has dropped this
    /// subscriber and the backlog is drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Takes the next payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
