//! An in-memory [`EventStore`], feature-gated behind `testing`.
//!
//! Exists so that `gridsync-hub`, `gridsync-solve` and `gridsync-catalog`
//! can exercise their logic against a real `EventStore` implementation
//! without bringing up Postgres. It honors the same contract real
//! backends do: monotonic contiguous `seq` per stream. Optimistic
//! conflict detection is a non-issue here since the whole store is
//! behind one mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::event::{EventPayload, PersistedEvent, Seq, StreamKind};
use crate::store::{EventStore, SeqRange, Snapshot, StoreError};

#[derive(Default)]
struct StreamLog {
    events: Vec<PersistedEvent>,
    snapshot: Option<Snapshot>,
}

/// A process-local, mutex-guarded [`EventStore`]. Not for production
/// use: no durability, no cross-process visibility.
#[derive(Default)]
pub struct InMemoryEventStore {
    streams: Mutex<HashMap<(StreamKind, String), StreamLog>>,
}

impl InMemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        payload: EventPayload,
        user_id: Option<String>,
        timestamp: i64,
        schema_version: i32,
    ) -> Result<PersistedEvent, StoreError> {
        if !payload.valid_for(stream_kind) {
            return Err(StoreError::Conflict {
                stream_kind,
                stream_id: stream_id.to_owned(),
                reason: format!("{} is not valid on a {stream_kind} stream", payload.event_type()),
            });
        }

        let mut streams = self.streams.lock().expect("event store mutex poisoned");
        let log = streams
            .entry((stream_kind, stream_id.to_owned()))
            .or_default();

        let seq: Seq = log.events.last().map_or(1, |e| e.seq + 1);
        let event = PersistedEvent {
            stream_kind,
            stream_id: stream_id.to_owned(),
            seq,
            user_id,
            timestamp,
            schema_version,
            payload,
        };

        log.events.push(event.clone());
        Ok(event)
    }

    async fn read(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        range: SeqRange,
    ) -> Result<Vec<PersistedEvent>, StoreError> {
        let streams = self.streams.lock().expect("event store mutex poisoned");
        let events = streams
            .get(&(stream_kind, stream_id.to_owned()))
            .map(|log| {
                log.events
                    .iter()
                    .filter(|e| range.contains(e.seq))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn get_snapshot(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
    ) -> Result<Option<Snapshot>, StoreError> {
        let streams = self.streams.lock().expect("event store mutex poisoned");
        Ok(streams
            .get(&(stream_kind, stream_id.to_owned()))
            .and_then(|log| log.snapshot.clone()))
    }

    async fn upsert_snapshot(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        data: serde_json::Value,
        snapshot_seq: Seq,
    ) -> Result<(), StoreError> {
        let mut streams = self.streams.lock().expect("event store mutex poisoned");
        let log = streams
            .entry((stream_kind, stream_id.to_owned()))
            .or_default();

        let now = Utc::now();
        let created_at = log
            .snapshot
            .as_ref()
            .map_or(now, |existing| existing.created_at);

        log.snapshot = Some(Snapshot {
            stream_id: stream_id.to_owned(),
            data,
            snapshot_seq,
            created_at,
            updated_at: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::UserJoinPayload;

    #[tokio::test]
    async fn append_assigns_contiguous_seq() {
        let store = InMemoryEventStore::new();
        let e1 = store
            .append(
                StreamKind::Room,
                "r1",
                EventPayload::UserJoin(UserJoinPayload {
                    user_id: "u1".into(),
                    display_name: "Ada".into(),
                }),
                None,
                1,
                1,
            )
            .await
            .unwrap();
        let e2 = store
            .append(
                StreamKind::Room,
                "r1",
                EventPayload::UserJoin(UserJoinPayload {
                    user_id: "u2".into(),
                    display_name: "Grace".into(),
                }),
                None,
                2,
                1,
            )
            .await
            .unwrap();

        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);
    }

    #[tokio::test]
    async fn rejects_event_type_invalid_for_stream_kind() {
        let store = InMemoryEventStore::new();
        let result = store
            .append(
                StreamKind::Game,
                "g1",
                EventPayload::UserJoin(UserJoinPayload {
                    user_id: "u1".into(),
                    display_name: "Ada".into(),
                }),
                None,
                1,
                1,
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn read_respects_seq_range() {
        let store = InMemoryEventStore::new();
        for i in 0..5 {
            store
                .append(
                    StreamKind::Room,
                    "r1",
                    EventPayload::UserJoin(UserJoinPayload {
                        user_id: format!("u{i}"),
                        display_name: "X".into(),
                    }),
                    None,
                    i,
                    1,
                )
                .await
                .unwrap();
        }

        let page = store
            .read(StreamKind::Room, "r1", SeqRange::from(3))
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].seq, 3);
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let store = InMemoryEventStore::new();
        assert!(store
            .get_snapshot(StreamKind::Game, "g1")
            .await
            .unwrap()
            .is_none());

        store
            .upsert_snapshot(StreamKind::Game, "g1", serde_json::json!({"a": 1}), 5)
            .await
            .unwrap();

        let snap = store
            .get_snapshot(StreamKind::Game, "g1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.snapshot_seq, 5);
    }
}
