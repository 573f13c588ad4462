//! The Event Store contract.
//!
//! `append` is the only operation allowed to mutate a stream; it is
//! responsible for assigning the monotonic [`Seq`] under concurrent
//! writers. Everything else is read-only. Concrete backends live
//! in their own crates (`gridsync-store-postgres`); this module only
//! fixes the contract and is depended on by the in-memory reference
//! implementation in [`crate::testing`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventPayload, PersistedEvent, Seq, StreamKind};

/// A range bound for [`EventStore::read`]. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqRange {
    pub from_seq: Option<Seq>,
    pub to_seq: Option<Seq>,
}

impl SeqRange {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(from_seq: Seq) -> Self {
        Self {
            from_seq: Some(from_seq),
            to_seq: None,
        }
    }

    #[must_use]
    pub fn contains(&self, seq: Seq) -> bool {
        self.from_seq.map_or(true, |from| seq >= from) && self.to_seq.map_or(true, |to| seq <= to)
    }
}

/// Cached projection of a stream at a known [`Seq`]. An optimization
/// only: correctness never depends on a snapshot being present. A
/// snapshot whose `snapshot_seq` exceeds the persisted event count is
/// invalid and must be ignored by whoever reads it back (see
/// `gridsync-core::projection`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stream_id: String,
    pub data: serde_json::Value,
    pub snapshot_seq: Seq,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors returned by an [`EventStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The sequence-number retry loop exhausted its attempts.
    #[error("conflict appending to stream {stream_kind}:{stream_id}: {reason}")]
    Conflict {
        stream_kind: StreamKind,
        stream_id: String,
        reason: String,
    },

    /// The backing store or its transport is unreachable.
    #[error("event store backend unavailable: {0}")]
    BackendUnavailable(#[source] anyhow::Error),
}

impl From<StoreError> for crate::error::CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => crate::error::CoreError::Conflict(err.to_string()),
            StoreError::BackendUnavailable(e) => crate::error::CoreError::BackendUnavailable(e),
        }
    }
}

/// The append-only, per-stream-sequenced Event Store.
///
/// Implementations MUST pick one of two strategies (serialized
/// next-seq under `SERIALIZABLE`, or an advisory lock per stream) and
/// document the choice; either way the
/// `UNIQUE(stream_id, seq)` index is the correctness backstop, and
/// retry-on-conflict is the liveness mechanism. See
/// `gridsync-store-postgres` for the chosen implementation.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a single event to the given stream, assigning it the
    /// next sequence number. Returns the persisted record.
    async fn append(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        payload: EventPayload,
        user_id: Option<String>,
        timestamp: i64,
        schema_version: i32,
    ) -> Result<PersistedEvent, StoreError>;

    /// Reads a stream's events in ascending `seq` order, optionally
    /// bounded by `range`. Absent bounds read the whole stream.
    async fn read(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        range: SeqRange,
    ) -> Result<Vec<PersistedEvent>, StoreError>;

    /// Fetches the snapshot slot for a stream, if any.
    async fn get_snapshot(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
    ) -> Result<Option<Snapshot>, StoreError>;

    /// Overwrites the snapshot slot for a stream. One-writer-wins;
    /// stale snapshots are tolerated, they just waste a replay.
    async fn upsert_snapshot(
        &self,
        stream_kind: StreamKind,
        stream_id: &str,
        data: serde_json::Value,
        snapshot_seq: Seq,
    ) -> Result<(), StoreError>;
}
