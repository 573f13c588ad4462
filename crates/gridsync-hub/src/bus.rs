//! The contract for the cross-instance transport: every
//! instance of the service publishes persisted events to a bus channel
//! named after the stream, and subscribes to it on behalf of its own
//! local subscribers. `gridsync-bus-redis` is the production
//! implementation (`PUBLISH`/`SUBSCRIBE`); [`NullBus`] below is the
//! single-instance/test stand-in.

use async_trait::async_trait;
use futures::stream::BoxStream;
use gridsync_core::event::{PersistedEvent, StreamKind};
use serde::{Deserialize, Serialize};

/// Channel name a [`Bus`] publishes/subscribes under for a given
/// stream, e.g. `game:abc123`.
#[must_use]
pub fn channel_name(kind: StreamKind, stream_id: &str) -> String {
    format!("{kind}:{stream_id}")
}

/// An event on the wire between instances: the persisted event plus
/// the id of the instance that originated it, so receivers can
/// suppress the echo back to the instance that already broadcast it
/// locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub origin_id: String,
    pub event: PersistedEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus transport error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("message on bus channel failed to decode: {0}")]
    Decode(#[source] anyhow::Error),
}

/// Cross-instance publish/subscribe. Implementations only need to
/// deliver messages at-least-once and need not preserve ordering
/// across channels; the hub's reorder buffer handles per-channel
/// ordering on the receiving side.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, channel: &str, message: BusMessage) -> Result<(), BusError>;

    /// Subscribes to a channel. The returned stream lives until
    /// dropped; it never terminates on its own.
    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<BoxStream<'static, Result<BusMessage, BusError>>, BusError>;
}

/// A [`Bus`] that delivers nothing. Used where the hub runs with a
/// single instance and cross-instance fan-out is a no-op — notably
/// tests, and `gridsync-server` run without `--bus-url`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBus;

#[async_trait]
impl Bus for NullBus {
    async fn publish(&self, _channel: &str, _message: BusMessage) -> Result<(), BusError> {
        Ok(())
    }

    async fn subscribe(
        &self,
        _channel: &str,
    ) -> Result<BoxStream<'static, Result<BusMessage, BusError>>, BusError> {
        Ok(Box::pin(futures::stream::pending()))
    }
}
