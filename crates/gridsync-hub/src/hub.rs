//! [`StreamHub`]: the persist-then-broadcast entry point every writer
//! goes through, and [`Subscription`]: what a reader gets back.

use std::sync::Arc;
use std::time::Duration;

use gridsync_core::event::{EventPayload, PersistedEvent, Seq, StreamKind};
use gridsync_core::store::{EventStore, SeqRange};
use gridsync_core::CoreError;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::bus::{channel_name, Bus, BusMessage};
use crate::error::HubError;
use crate::reorder::{ReorderBuffer, DEFAULT_WINDOW};
use crate::registry::Registry;

/// Tunables for a [`StreamHub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each subscriber's outbound queue before it is
    /// dropped for backpressure.
    pub outbound_queue_capacity: usize,
    /// How long the reorder buffer waits for a missing `seq` before
    /// falling back to a gap-fill read.
    pub reorder_window: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            outbound_queue_capacity: 128,
            reorder_window: DEFAULT_WINDOW,
        }
    }
}

/// The realtime stream hub. Generic over the event store and bus
/// so `gridsync-server` can wire in the Postgres store and Redis bus,
/// while tests wire in [`gridsync_core::testing::InMemoryEventStore`]
/// and [`crate::bus::NullBus`].
pub struct StreamHub<S, B> {
    store: Arc<S>,
    bus: Arc<B>,
    origin_id: String,
    config: HubConfig,
    registry: Arc<Registry>,
}

impl<S, B> StreamHub<S, B>
where
    S: EventStore + 'static,
    B: Bus + 'static,
{
    pub fn new(store: Arc<S>, bus: Arc<B>, origin_id: impl Into<String>, config: HubConfig) -> Self {
        StreamHub {
            store,
            bus,
            origin_id: origin_id.into(),
            config,
            registry: Arc::new(Registry::default()),
        }
    }

    /// Appends an event and fans it out: local subscribers first
    /// (always succeeds once the append does), then the bus for other
    /// instances (best-effort — a publish failure is logged, not
    /// propagated, since the write itself already succeeded).
    #[tracing::instrument(skip(self, payload), fields(stream = %stream_id))]
    pub async fn append_and_broadcast(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        payload: EventPayload,
        user_id: Option<String>,
        timestamp: i64,
        schema_version: i32,
    ) -> Result<PersistedEvent, HubError> {
        let event = self
            .store
            .append(stream_kind, stream_id, payload, user_id, timestamp, schema_version)
            .await
            .map_err(CoreError::from)?;

        self.registry.broadcast(Arc::new(event.clone()));

        let channel = channel_name(stream_kind, stream_id);
        let message = BusMessage {
            origin_id: self.origin_id.clone(),
            event: event.clone(),
        };
        if let Err(err) = self.bus.publish(&channel, message).await {
            tracing::warn!(error = %err, channel, "failed to publish event to bus");
        }

        Ok(event)
    }

    /// Subscribes to a stream's events from this moment forward. The
    /// first subscriber for a stream causes the hub to start relaying
    /// that stream's bus channel; the last one to drop stops it.
    pub async fn subscribe(&self, stream_kind: StreamKind, stream_id: &str) -> Subscription {
        let key = (stream_kind, stream_id.to_owned());
        let (id, rx, is_first) = self
            .registry
            .subscribe(key.clone(), self.config.outbound_queue_capacity);

        if is_first {
            self.spawn_relay(stream_kind, stream_id.to_owned());
        }

        Subscription {
            id,
            key,
            rx,
            registry: self.registry.clone(),
        }
    }

    /// Catch-up read: everything persisted for a stream with
    /// `seq > after`, for a client reconnecting after a gap.
    pub async fn catch_up(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        after: Seq,
    ) -> Result<Vec<PersistedEvent>, HubError> {
        self.store
            .read(stream_kind, stream_id, SeqRange::from(after + 1))
            .await
            .map_err(CoreError::from)
            .map_err(HubError::from)
    }

    /// Stops every relay task and drops every subscriber. Subsequent
    /// `append_and_broadcast` calls still succeed (the store is
    /// untouched); they simply reach no one.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    fn spawn_relay(&self, stream_kind: StreamKind, stream_id: String) {
        let bus = self.bus.clone();
        let store = self.store.clone();
        let registry = self.registry.clone();
        let origin_id = self.origin_id.clone();
        let window = self.config.reorder_window;
        let key = (stream_kind, stream_id.clone());
        let span = tracing::info_span!("bus_relay", stream = %stream_id, kind = %stream_kind);

        let handle = tokio::spawn(
            async move {
                let channel = channel_name(stream_kind, &stream_id);
                let mut incoming = match bus.subscribe(&channel).await {
                    Ok(stream) => stream,
                    Err(err) => {
                        tracing::warn!(error = %err, channel, "failed to subscribe to bus channel");
                        return;
                    }
                };

                let mut buffer = ReorderBuffer::new();
                use futures::StreamExt;

                loop {
                    let next = tokio::time::timeout(window, incoming.next()).await;
                    match next {
                        Ok(Some(Ok(message))) => {
                            if message.origin_id == origin_id {
                                // Already broadcast locally when this
                                // instance persisted it.
                                continue;
                            }
                            for ready in buffer.push(message.event) {
                                registry.broadcast(Arc::new(ready));
                            }
                        }
                        Ok(Some(Err(err))) => {
                            tracing::warn!(error = %err, channel, "bus delivery error");
                        }
                        Ok(None) => break,
                        Err(_timeout) => {}
                    }

                    if buffer.has_gap() {
                        if let Some(after) = buffer.next_expected() {
                            match store
                                .read(stream_kind, &stream_id, SeqRange::from(after))
                                .await
                            {
                                Ok(fetched) if !fetched.is_empty() => {
                                    for ready in buffer.resolve_gap(fetched) {
                                        registry.broadcast(Arc::new(ready));
                                    }
                                }
                                Ok(_) => {}
                                Err(err) => {
                                    tracing::warn!(error = %err, "gap-fill read failed");
                                }
                            }
                        }
                    }
                }
            }
            .instrument(span),
        );

        self.registry.set_relay(key, handle);
    }
}

/// A live subscription to one stream's events. Implements nothing
/// fancy: `recv().await` for the next event, in `seq` order, until the
/// hub shuts down or this handle is dropped.
pub struct Subscription {
    id: u64,
    key: (StreamKind, String),
    rx: mpsc::Receiver<Arc<PersistedEvent>>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Arc<PersistedEvent>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.unsubscribe(&self.key, self.id) {
            self.registry.stop_relay(&self.key);
        }
    }
}
