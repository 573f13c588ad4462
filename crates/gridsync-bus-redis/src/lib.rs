//! Redis-backed [`Bus`]: every instance publishes persisted
//! events with `PUBLISH` on a channel named after the stream
//! (`game:<gid>` / `room:<rid>`, see [`gridsync_hub::bus::channel_name`])
//! and relays them to its own local subscribers via `SUBSCRIBE`.
//!
//! Redis pub/sub delivers at-most-once to currently-subscribed clients
//! and gives no ordering guarantee across channels, which is exactly
//! why [`gridsync_hub::StreamHub`] keeps a per-stream reorder buffer
//! and a gap-fill read on the receiving side rather than relying on
//! the transport.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use gridsync_hub::bus::{Bus, BusError, BusMessage};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

/// A [`Bus`] backed by a Redis server reachable over `redis_url`.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publish_conn: MultiplexedConnection,
}

impl RedisBus {
    /// Opens the client and a multiplexed connection used for
    /// publishing. Each `subscribe` call opens its own dedicated
    /// connection, since a Redis connection in subscriber mode can't
    /// also run other commands.
    pub async fn connect(redis_url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url).map_err(transport)?;
        let publish_conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;

        Ok(RedisBus {
            client,
            publish_conn,
        })
    }
}

fn transport(err: impl Into<anyhow::Error>) -> BusError {
    BusError::Transport(err.into())
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, message: BusMessage) -> Result<(), BusError> {
        let payload = serde_json::to_vec(&message).map_err(|err| BusError::Decode(err.into()))?;
        let mut conn = self.publish_conn.clone();
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<BoxStream<'static, Result<BusMessage, BusError>>, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(transport)?;
        pubsub.subscribe(channel).await.map_err(transport)?;

        let stream = pubsub.into_on_message().map(|msg| {
            let payload: Vec<u8> = msg.get_payload().map_err(transport)?;
            serde_json::from_slice::<BusMessage>(&payload).map_err(|err| BusError::Decode(err.into()))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_core::event::{EventPayload, StreamKind, UserJoinPayload};

    fn sample_message() -> BusMessage {
        BusMessage {
            origin_id: "instance-a".into(),
            event: gridsync_core::event::PersistedEvent {
                stream_kind: StreamKind::Room,
                stream_id: "r1".into(),
                seq: 1,
                user_id: None,
                timestamp: 1,
                schema_version: 1,
                payload: EventPayload::UserJoin(UserJoinPayload {
                    user_id: "u1".into(),
                    display_name: "Ada".into(),
                }),
            },
        }
    }

    #[test]
    fn bus_message_round_trips_through_json() {
        let message = sample_message();
        let encoded = serde_json::to_vec(&message).unwrap();
        let decoded: BusMessage = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.origin_id, message.origin_id);
        assert_eq!(decoded.event.seq, message.event.seq);
    }

    #[tokio::test]
    #[ignore = "requires docker for testcontainers; run explicitly with --ignored"]
    async fn publish_is_received_by_a_subscriber() {
        use testcontainers::clients::Cli;
        use testcontainers::images::redis::Redis;
        use testcontainers::Docker;

        let docker = Cli::default();
        let container = docker.run(Redis::default());
        let port = container.get_host_port(6379).unwrap();
        let url = format!("redis://127.0.0.1:{port}");

        let bus = RedisBus::connect(&url).await.unwrap();
        let mut incoming = bus.subscribe("room:r1").await.unwrap();

        bus.publish("room:r1", sample_message()).await.unwrap();

        let received = incoming.next().await.unwrap().unwrap();
        assert_eq!(received.event.stream_id, "r1");
    }
}
