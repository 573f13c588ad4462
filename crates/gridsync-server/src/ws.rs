//! The realtime wire protocol: a single WebSocket per
//! client, framed as tagged JSON. `join`/`leave` manage subscriptions
//! through [`gridsync_hub::StreamHub`]; `sync_all_*_events` is a
//! request-reply catch-up read; `game_event`/`room_event` publish
//! through the hub. Structured span propagation wraps the whole
//! connection in one `info_span!` carrying a generated
//! `connection_id`.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use gridsync_core::event::{EventPayload, PersistedEvent, StreamKind};
use gridsync_core::store::SeqRange;
use gridsync_core::{CoreError, EventStore};
use gridsync_hub::HubError;
use gridsync_util::sentinel::substitute_timestamp_sentinel;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Join { kind: StreamKind, id: String },
    Leave { kind: StreamKind, id: String },
    SyncAllGameEvents { gid: String },
    SyncAllRoomEvents { rid: String },
    GameEvent {
        gid: String,
        #[serde(default)]
        user_id: Option<String>,
        payload: serde_json::Value,
    },
    RoomEvent {
        rid: String,
        #[serde(default)]
        user_id: Option<String>,
        payload: serde_json::Value,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Joined { kind: StreamKind, id: String },
    Left { kind: StreamKind, id: String },
    GameEvents { gid: String, events: Vec<PersistedEvent> },
    RoomEvents { rid: String, events: Vec<PersistedEvent> },
    GameEvent { event: PersistedEvent },
    RoomEvent { event: PersistedEvent },
    Error { message: String },
}

pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("ws_connection", %connection_id);

    async move {
        let (mut sink, mut stream) = socket.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(state.config.outbound_queue_capacity);
        let mut relays: HashMap<(StreamKind, String), JoinHandle<()>> = HashMap::new();

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let encoded = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to encode outgoing message");
                        continue;
                    }
                };
                if sink.send(Message::Text(encoded)).await.is_err() {
                    break;
                }
            }
        });

        loop {
            let Some(Ok(message)) = stream.next().await else {
                break;
            };

            let Message::Text(text) = message else {
                continue;
            };

            let client_message: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(err) => {
                    let _ = outbound_tx
                        .send(ServerMessage::Error {
                            message: format!("malformed frame: {err}"),
                        })
                        .await;
                    continue;
                }
            };

            handle_client_message(client_message, &state, &outbound_tx, &mut relays).await;
        }

        for (_, handle) in relays {
            handle.abort();
        }
        writer.abort();
    }
    .instrument(span)
    .await;
}

async fn handle_client_message(
    message: ClientMessage,
    state: &AppState,
    outbound_tx: &mpsc::Sender<ServerMessage>,
    relays: &mut HashMap<(StreamKind, String), JoinHandle<()>>,
) {
    match message {
        ClientMessage::Join { kind, id } => {
            let key = (kind, id.clone());
            relays.entry(key).or_insert_with(|| {
                let hub = state.hub.clone();
                let tx = outbound_tx.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    let mut subscription = hub.subscribe(kind, &id).await;
                    while let Some(event) = subscription.recv().await {
                        let message = match kind {
                            StreamKind::Game => ServerMessage::GameEvent { event: (*event).clone() },
                            StreamKind::Room => ServerMessage::RoomEvent { event: (*event).clone() },
                        };
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                })
            });
            let _ = outbound_tx.send(ServerMessage::Joined { kind, id }).await;
        }
        ClientMessage::Leave { kind, id } => {
            if let Some(handle) = relays.remove(&(kind, id.clone())) {
                handle.abort();
            }
            let _ = outbound_tx.send(ServerMessage::Left { kind, id }).await;
        }
        ClientMessage::SyncAllGameEvents { gid } => {
            match state.store.read(StreamKind::Game, &gid, SeqRange::all()).await {
                Ok(events) => {
                    let _ = outbound_tx.send(ServerMessage::GameEvents { gid, events }).await;
                }
                Err(err) => send_error(outbound_tx, CoreError::from(err)).await,
            }
        }
        ClientMessage::SyncAllRoomEvents { rid } => {
            match state.store.read(StreamKind::Room, &rid, SeqRange::all()).await {
                Ok(events) => {
                    let _ = outbound_tx.send(ServerMessage::RoomEvents { rid, events }).await;
                }
                Err(err) => send_error(outbound_tx, CoreError::from(err)).await,
            }
        }
        ClientMessage::GameEvent { gid, user_id, payload } => {
            publish(state, outbound_tx, StreamKind::Game, &gid, user_id, payload).await;
        }
        ClientMessage::RoomEvent { rid, user_id, payload } => {
            publish(state, outbound_tx, StreamKind::Room, &rid, user_id, payload).await;
        }
    }
}

async fn publish(
    state: &AppState,
    outbound_tx: &mpsc::Sender<ServerMessage>,
    kind: StreamKind,
    stream_id: &str,
    user_id: Option<String>,
    mut payload: serde_json::Value,
) {
    let now_ms = Utc::now().timestamp_millis();
    substitute_timestamp_sentinel(&mut payload, now_ms);

    let payload: EventPayload = match serde_json::from_value(payload) {
        Ok(payload) => payload,
        Err(err) => {
            send_error(outbound_tx, CoreError::Validation(err.to_string())).await;
            return;
        }
    };

    let result = state
        .hub
        .append_and_broadcast(kind, stream_id, payload, user_id, now_ms, 1)
        .await;

    if let Err(err) = result {
        send_error(outbound_tx, hub_error_to_core(err)).await;
    }
}

fn hub_error_to_core(err: HubError) -> CoreError {
    match err {
        HubError::Core(core) => core,
        HubError::ShuttingDown => {
            CoreError::BackendUnavailable(anyhow::anyhow!("stream hub is shutting down"))
        }
    }
}

async fn send_error(outbound_tx: &mpsc::Sender<ServerMessage>, err: CoreError) {
    let _ = outbound_tx
        .send(ServerMessage::Error { message: err.to_string() })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_frame_decodes() {
        let raw = r#"{"type":"join","kind":"game","id":"g1"}"#;
        let message: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            message,
            ClientMessage::Join { kind: StreamKind::Game, id } if id == "g1"
        ));
    }

    #[test]
    fn game_event_frame_decodes_with_raw_payload() {
        let raw = r#"{"type":"game_event","gid":"g1","payload":{"type":"cursor_move","payload":{"row":1,"col":2}}}"#;
        let message: ClientMessage = serde_json::from_str(raw).unwrap();
        match message {
            ClientMessage::GameEvent { gid, user_id, payload } => {
                assert_eq!(gid, "g1");
                assert!(user_id.is_none());
                let decoded: EventPayload = serde_json::from_value(payload).unwrap();
                assert!(matches!(decoded, EventPayload::CursorMove(_)));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn error_frame_encodes_with_tag() {
        let message = ServerMessage::Error {
            message: "boom".to_owned(),
        };
        let encoded = serde_json::to_string(&message).unwrap();
        assert_eq!(encoded, r#"{"type":"error","message":"boom"}"#);
    }
}
