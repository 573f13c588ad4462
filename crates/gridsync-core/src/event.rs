//! The closed event-type taxonomy and the envelope every event is
//! carried in, from the moment a client drafts it to the moment it is
//! persisted.
//!
//! Two stream kinds exist, [`StreamKind::Game`] keyed by `gid` and
//! [`StreamKind::Room`] keyed by `rid`. Every event belongs to exactly
//! one stream and, once persisted, carries a [`Seq`] that is unique and
//! contiguous within that stream (see [`crate::store`] for the
//! invariant this crate never breaks).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Monotonic, per-stream sequence number. Streams start at 1; there are
/// no gaps.
pub type Seq = i64;

/// The two kinds of stream this engine serializes events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Game,
    Room,
}

impl StreamKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Game => "game",
            StreamKind::Room => "room",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(row, col)` cell reference, used both as the target of a
/// `cell_*` event and as an entry in its optional `scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

/// How a cell was filled — distinguishes a pencil mark from an inked
/// answer. See `DESIGN.md` for the open-question resolution: a
/// `cell_clear` always blanks the value and resets this mark, whatever
/// it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    Ink,
    Pencil,
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::Ink
    }
}

/// Action carried by a `clock_update` event. Drives the clock state
/// machine in [`crate::projection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockAction {
    Start,
    Pause,
    Resume,
}

/// Payload for the `create` event: the first event of every game
/// stream, carrying the view the client needs to render the blank grid
/// plus the puzzle it was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePayload {
    /// Public identifier of the source puzzle.
    pub pid: String,
    pub view: GameView,
}

/// The puzzle data a `create` event carries into the game stream: info,
/// the blank grid (black cells derived from the solution), the
/// solution itself (needed for `cell_check`/`cell_reveal`), clues,
/// circles and shades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub info: crate::puzzle::PuzzleInfo,
    pub grid: Vec<Vec<BlankCell>>,
    pub solution: Vec<Vec<String>>,
    pub clues: crate::puzzle::Clues,
    pub circles: Vec<Cell>,
    pub shades: Vec<Cell>,
}

/// A cell in the blank grid derived from the solution: black cells
/// (`solution[r][c] == ""`) carry no value and can never be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankCell {
    pub black: bool,
}

/// Payload for `cell_fill`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFillPayload {
    pub row: i32,
    pub col: i32,
    pub value: String,
    #[serde(default)]
    pub mode: FillMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved_by: Option<String>,
}

/// Payload for `cell_clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellClearPayload {
    pub row: i32,
    pub col: i32,
}

/// Payload shared by `cell_check` and `cell_reveal`: a primary cell
/// plus an optional scope of additional cells the action applies to
/// (used for word/region reveal and check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellScopePayload {
    pub row: i32,
    pub col: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<Cell>>,
}

impl CellScopePayload {
    /// All cells this event applies to: the primary cell plus the
    /// scope, if any. Used by both the projector and the solve
    /// service's distinct-cell counting (spec scenario 3).
    pub fn affected_cells(&self) -> Vec<Cell> {
        match &self.scope {
            Some(scope) if !scope.is_empty() => scope.clone(),
            _ => vec![Cell {
                row: self.row,
                col: self.col,
            }],
        }
    }
}

/// Payload for `cursor_move`. The moving user is the envelope's
/// `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorMovePayload {
    pub row: i32,
    pub col: i32,
}

/// Payload for `chat_message`, shared by game and room streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub user_id: String,
    pub display_name: String,
    pub message: String,
}

/// Payload for `clock_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockUpdatePayload {
    pub action: ClockAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<i64>,
}

/// Payload for `puzzle_solved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleSolvedPayload {
    pub solved_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<i64>,
}

/// Payload for `user_join`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJoinPayload {
    pub user_id: String,
    pub display_name: String,
}

/// Payload for `user_leave`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeavePayload {
    pub user_id: String,
}

/// Payload for `room_settings_update`: an arbitrary JSON object merged
/// key-by-key into the room's settings map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSettingsUpdatePayload {
    pub settings: BTreeMap<String, serde_json::Value>,
}

/// The closed event-type taxonomy. Unknown tags at read time
/// must fail loud rather than be silently dropped, which is why this is
/// a `#[serde(tag = "type", content = "payload")]` enum rather than an
/// open `serde_json::Value`: deserializing an unrecognized `type` is a
/// hard decode error, not an `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    Create(CreatePayload),
    CellFill(CellFillPayload),
    CellClear(CellClearPayload),
    CellCheck(CellScopePayload),
    CellReveal(CellScopePayload),
    CursorMove(CursorMovePayload),
    ChatMessage(ChatMessagePayload),
    ClockUpdate(ClockUpdatePayload),
    PuzzleSolved(PuzzleSolvedPayload),
    UserJoin(UserJoinPayload),
    UserLeave(UserLeavePayload),
    RoomSettingsUpdate(RoomSettingsUpdatePayload),
}

impl EventPayload {
    /// The wire/DB tag for this event, e.g. `"cell_fill"`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::Create(_) => "create",
            EventPayload::CellFill(_) => "cell_fill",
            EventPayload::CellClear(_) => "cell_clear",
            EventPayload::CellCheck(_) => "cell_check",
            EventPayload::CellReveal(_) => "cell_reveal",
            EventPayload::CursorMove(_) => "cursor_move",
            EventPayload::ChatMessage(_) => "chat_message",
            EventPayload::ClockUpdate(_) => "clock_update",
            EventPayload::PuzzleSolved(_) => "puzzle_solved",
            EventPayload::UserJoin(_) => "user_join",
            EventPayload::UserLeave(_) => "user_leave",
            EventPayload::RoomSettingsUpdate(_) => "room_settings_update",
        }
    }

    /// Whether this event type is valid on a [`StreamKind::Game`]
    /// stream. `chat_message` is valid on both kinds.
    #[must_use]
    pub fn valid_for(&self, kind: StreamKind) -> bool {
        use EventPayload::{
            CellCheck, CellClear, CellFill, CellReveal, ChatMessage, ClockUpdate, Create,
            CursorMove, PuzzleSolved, RoomSettingsUpdate, UserJoin, UserLeave,
        };

        match (self, kind) {
            (ChatMessage(_), _) => true,
            (
                Create(_) | CellFill(_) | CellClear(_) | CellCheck(_) | CellReveal(_)
                | CursorMove(_) | ClockUpdate(_) | PuzzleSolved(_),
                StreamKind::Game,
            ) => true,
            (UserJoin(_) | UserLeave(_) | RoomSettingsUpdate(_), StreamKind::Room) => true,
            _ => false,
        }
    }
}

/// An event as drafted by a client (or by the server for the initial
/// `create`), before it has been assigned a [`Seq`] by the store.
///
/// The draft's payload may still contain the legacy `{".sv":
/// "timestamp"}` sentinel anywhere in its JSON tree; [`crate::store`]
/// callers are expected to normalize it (substitute the server's
/// wall-clock) before calling `Append`. Because [`EventPayload`] is a
/// typed enum rather than raw JSON, the sentinel substitution happens
/// one layer up, on the raw JSON the transport received, before it is
/// deserialized into an `EventDraft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub stream_kind: StreamKind,
    pub stream_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: i64,
    #[serde(default = "default_schema_version")]
    pub schema_version: i32,
    pub payload: EventPayload,
}

fn default_schema_version() -> i32 {
    1
}

/// An event once persisted: the draft plus its assigned, unique,
/// contiguous [`Seq`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub stream_kind: StreamKind,
    pub stream_id: String,
    pub seq: Seq,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: i64,
    pub schema_version: i32,
    pub payload: EventPayload,
}

impl PersistedEvent {
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
