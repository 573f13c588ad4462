//! The subscriber registry: who is listening to which stream, and the
//! bounded, drop-on-overflow delivery to each of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gridsync_core::event::{PersistedEvent, StreamKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type StreamKey = (StreamKind, String);

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Arc<PersistedEvent>>,
}

/// Shared between [`crate::hub::StreamHub`] and every live
/// [`crate::hub::Subscription`]; outlives neither on its own.
#[derive(Default)]
pub(crate) struct Registry {
    subscribers: Mutex<HashMap<StreamKey, Vec<Subscriber>>>,
    relays: Mutex<HashMap<StreamKey, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Registers a new subscriber for `key`, returning its id, the
    /// receiving half of its channel, and whether this is the first
    /// subscriber for that stream (the caller should spawn a bus relay
    /// for the stream exactly when this is `true`).
    pub fn subscribe(
        &self,
        key: StreamKey,
        capacity: usize,
    ) -> (u64, mpsc::Receiver<Arc<PersistedEvent>>, bool) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subs = self.subscribers.lock().expect("registry mutex poisoned");
        let entry = subs.entry(key).or_default();
        let is_first = entry.is_empty();
        entry.push(Subscriber { id, tx });

        (id, rx, is_first)
    }

    /// Removes a subscriber. Returns `true` if it was the last one for
    /// `key` (the caller should stop the stream's bus relay, if any).
    pub fn unsubscribe(&self, key: &StreamKey, id: u64) -> bool {
        let mut subs = self.subscribers.lock().expect("registry mutex poisoned");
        let Some(entry) = subs.get_mut(key) else {
            return true;
        };
        entry.retain(|s| s.id != id);
        let now_empty = entry.is_empty();
        if now_empty {
            subs.remove(key);
        }
        now_empty
    }

    /// Snapshots the subscriber list for `key`, then releases the
    /// lock before any send happens — broadcasting never holds the
    /// registry lock, so a slow subscriber can't stall registration of
    /// new ones.
    fn snapshot(&self, key: &StreamKey) -> Vec<(u64, mpsc::Sender<Arc<PersistedEvent>>)> {
        let subs = self.subscribers.lock().expect("registry mutex poisoned");
        subs.get(key)
            .map(|entry| entry.iter().map(|s| (s.id, s.tx.clone())).collect())
            .unwrap_or_default()
    }

    /// Delivers `event` to every current subscriber of its stream.
    /// A subscriber whose queue is full is dropped rather than
    /// blocked on (bounded queues, drop-on-overflow).
    pub fn broadcast(&self, event: Arc<PersistedEvent>) {
        let key = (event.stream_kind, event.stream_id.clone());
        for (id, tx) in self.snapshot(&key) {
            if tx.try_send(event.clone()).is_err() {
                self.unsubscribe(&key, id);
            }
        }
    }

    pub fn set_relay(&self, key: StreamKey, handle: JoinHandle<()>) {
        let mut relays = self.relays.lock().expect("registry mutex poisoned");
        if let Some(old) = relays.insert(key, handle) {
            old.abort();
        }
    }

    pub fn stop_relay(&self, key: &StreamKey) {
        if let Some(handle) = self
            .relays
            .lock()
            .expect("registry mutex poisoned")
            .remove(key)
        {
            handle.abort();
        }
    }

    pub fn shutdown(&self) {
        let relays = std::mem::take(&mut *self.relays.lock().expect("registry mutex poisoned"));
        for (_, handle) in relays {
            handle.abort();
        }
        self.subscribers
            .lock()
            .expect("registry mutex poisoned")
            .clear();
    }
}
