//! The pure fold from `(snapshot?, events)` to game/room state.
//!
//! Every function in this module is deterministic and does no I/O:
//! given the same ordered event list, it always yields the same
//! state, which is what makes snapshot replay and the property-based
//! determinism test possible without a test double for the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{
    BlankCell, Cell, ClockAction, EventPayload, FillMode, PersistedEvent, Seq, StreamKind,
};
use crate::puzzle::{Clues, PuzzleInfo};

/// Errors raised while folding events into state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// A game stream's first event (or the first event after a
    /// snapshot, if no snapshot exists) was not `create`.
    #[error("game stream {0} has no create event")]
    NoCreateEvent(String),
}

/// Left-folds a persisted event into the previous state. Mirrors the
/// teacher's `Projection::project`, but fallible: applying an event to
/// a projection that hasn't been bootstrapped yet (a game with no
/// `create`) is an error rather than a silently wrong default.
pub trait Projection: Sized {
    fn apply(self, event: &PersistedEvent) -> Self;
}

/// One cell of the live grid. Distinct from [`BlankCell`]: this is the
/// mutable, per-solve state, not the static blank-grid shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub black: bool,
    pub value: String,
    pub good: bool,
    pub bad: bool,
    pub revealed: bool,
    pub mode: FillMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved_by: Option<String>,
}

impl GridCell {
    fn from_blank(blank: BlankCell) -> Self {
        GridCell {
            black: blank.black,
            value: String::new(),
            good: false,
            bad: false,
            revealed: false,
            mode: FillMode::Ink,
            solved_by: None,
        }
    }
}

/// A user's last-known cursor position in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCursor {
    pub row: i32,
    pub col: i32,
    pub updated_at: i64,
}

/// A single chat line, as projected (envelope metadata folded in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_id: String,
    pub display_name: String,
    pub message: String,
    pub timestamp: i64,
}

/// Whether the clock is counting or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockPhase {
    Paused,
    Running,
}

/// The clock state machine: `start`/`resume` from `paused` moves to
/// `running`; `pause` from `running` accrues `total_time_ms` and moves
/// back to `paused`. Redundant transitions are idempotent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub phase: ClockPhase,
    pub total_time_ms: i64,
    pub last_updated: i64,
    created_at: i64,
}

impl ClockState {
    fn new(created_at: i64) -> Self {
        ClockState {
            phase: ClockPhase::Paused,
            total_time_ms: 0,
            last_updated: created_at,
            created_at,
        }
    }

    /// Wall-clock time elapsed since the game's `create` event,
    /// regardless of pause state. Derived on demand, never persisted
    /// — see `DESIGN.md`.
    #[must_use]
    pub fn true_total_time_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.created_at).max(0)
    }

    fn apply(&mut self, action: ClockAction, ts: i64, carried_total: Option<i64>) {
        match (self.phase, action) {
            (ClockPhase::Paused, ClockAction::Start | ClockAction::Resume) => {
                self.phase = ClockPhase::Running;
                self.last_updated = ts;
            }
            (ClockPhase::Running, ClockAction::Pause) => {
                self.total_time_ms += (ts - self.last_updated).max(0);
                if let Some(carried) = carried_total {
                    self.total_time_ms = carried;
                }
                self.phase = ClockPhase::Paused;
                self.last_updated = ts;
            }
            // Redundant transitions: start/resume while running, pause
            // while paused. No-ops beyond bumping last_updated so a
            // later pause doesn't double-count dead time.
            (ClockPhase::Running, ClockAction::Start | ClockAction::Resume) => {}
            (ClockPhase::Paused, ClockAction::Pause) => {}
        }
    }
}

/// Full projected state of a game stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub pid: String,
    pub info: PuzzleInfo,
    pub grid: Vec<Vec<GridCell>>,
    pub solution: Vec<Vec<String>>,
    pub clues: Clues,
    pub circles: Vec<Cell>,
    pub shades: Vec<Cell>,
    pub users: BTreeMap<String, UserCursor>,
    pub chat: Vec<ChatMessage>,
    pub clock: ClockState,
    pub solved: bool,
    pub last_seq: Seq,
}

impl GameState {
    fn from_create(event: &PersistedEvent) -> Result<Self, ProjectionError> {
        let EventPayload::Create(create) = &event.payload else {
            return Err(ProjectionError::NoCreateEvent(event.stream_id.clone()));
        };

        Ok(GameState {
            pid: create.pid.clone(),
            info: create.view.info.clone(),
            grid: create
                .view
                .grid
                .iter()
                .map(|row| row.iter().map(|c| GridCell::from_blank(*c)).collect())
                .collect(),
            solution: create.view.solution.clone(),
            clues: create.view.clues.clone(),
            circles: create.view.circles.clone(),
            shades: create.view.shades.clone(),
            users: BTreeMap::new(),
            chat: Vec::new(),
            clock: ClockState::new(event.timestamp),
            solved: false,
            last_seq: event.seq,
        })
    }

    fn cell_mut(&mut self, cell: Cell) -> Option<&mut GridCell> {
        self.grid
            .get_mut(usize::try_from(cell.row).ok()?)?
            .get_mut(usize::try_from(cell.col).ok()?)
    }
}

impl Projection for GameState {
    fn apply(mut self, event: &PersistedEvent) -> Self {
        match &event.payload {
            EventPayload::Create(_) => {
                // Only valid as the bootstrapping event; a second
                // `create` on an already-projected stream is ignored
                // rather than resetting state, since append-only
                // semantics mean it should never legitimately occur.
            }
            EventPayload::CellFill(fill) => {
                if let Some(cell) = self.cell_mut(Cell {
                    row: fill.row,
                    col: fill.col,
                }) {
                    cell.value = fill.value.clone();
                    cell.bad = false;
                    cell.mode = fill.mode;
                    if let Some(user) = &fill.solved_by {
                        cell.solved_by = Some(user.clone());
                    }
                }
            }
            EventPayload::CellClear(clear) => {
                if let Some(cell) = self.cell_mut(Cell {
                    row: clear.row,
                    col: clear.col,
                }) {
                    cell.value.clear();
                    cell.good = false;
                    cell.bad = false;
                    cell.mode = FillMode::Ink;
                }
            }
            EventPayload::CellCheck(scope) => {
                for target in scope.affected_cells() {
                    let (row, col) = (target.row, target.col);
                    let solution_value = self
                        .solution
                        .get(usize::try_from(row).unwrap_or(usize::MAX))
                        .and_then(|r| r.get(usize::try_from(col).unwrap_or(usize::MAX)))
                        .cloned();
                    if let Some(cell) = self.cell_mut(target) {
                        let correct = solution_value.as_deref() == Some(cell.value.as_str())
                            && !cell.value.is_empty();
                        cell.good = correct;
                        cell.bad = !correct;
                    }
                }
            }
            EventPayload::CellReveal(scope) => {
                for target in scope.affected_cells() {
                    let solution_value = self
                        .solution
                        .get(usize::try_from(target.row).unwrap_or(usize::MAX))
                        .and_then(|r| r.get(usize::try_from(target.col).unwrap_or(usize::MAX)))
                        .cloned()
                        .unwrap_or_default();
                    if let Some(cell) = self.cell_mut(target) {
                        cell.value = solution_value;
                        cell.revealed = true;
                        cell.good = false;
                        cell.bad = false;
                    }
                }
            }
            EventPayload::CursorMove(cursor) => {
                if let Some(user_id) = &event.user_id {
                    self.users.insert(
                        user_id.clone(),
                        UserCursor {
                            row: cursor.row,
                            col: cursor.col,
                            updated_at: event.timestamp,
                        },
                    );
                }
            }
            EventPayload::ChatMessage(chat) => {
                self.chat.push(ChatMessage {
                    user_id: chat.user_id.clone(),
                    display_name: chat.display_name.clone(),
                    message: chat.message.clone(),
                    timestamp: event.timestamp,
                });
            }
            EventPayload::ClockUpdate(update) => {
                self.clock
                    .apply(update.action, event.timestamp, update.total_time_ms);
            }
            EventPayload::PuzzleSolved(solved) => {
                self.solved = true;
                if let Some(total) = solved.total_time_ms {
                    self.clock.total_time_ms = total;
                }
            }
            // Room-only events never appear on a game stream; ignore
            // defensively rather than panic, since the invariant that
            // guarantees this lives at the append boundary, not here.
            EventPayload::UserJoin(_)
            | EventPayload::UserLeave(_)
            | EventPayload::RoomSettingsUpdate(_) => {}
        }

        self.last_seq = event.seq;
        self
    }
}

/// Folds a game stream's events into [`GameState`].
///
/// `snapshot` is the previously-projected state at `snapshot.last_seq`,
/// if any (the caller must have already verified `snapshot.last_seq`
/// does not exceed the stream's persisted length).
/// `events` must contain only events with `seq` strictly greater than
/// `snapshot.last_seq`, or, if `snapshot` is `None`, must start with
/// the stream's `create` event.
pub fn project_game(
    snapshot: Option<GameState>,
    events: &[PersistedEvent],
) -> Result<GameState, ProjectionError> {
    let mut iter = events.iter();

    let mut state = match snapshot {
        Some(state) => state,
        None => {
            let first = iter
                .next()
                .ok_or_else(|| ProjectionError::NoCreateEvent(String::new()))?;
            GameState::from_create(first)?
        }
    };

    for event in iter {
        state = state.apply(event);
    }

    Ok(state)
}

/// A room participant, keyed by `user_id` in [`RoomState::users`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    pub display_name: String,
    pub joined_at: i64,
}

/// Full projected state of a room stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    pub users: BTreeMap<String, RoomUser>,
    pub settings: BTreeMap<String, serde_json::Value>,
    pub chat: Vec<ChatMessage>,
    pub last_seq: Seq,
}

impl Projection for RoomState {
    fn apply(mut self, event: &PersistedEvent) -> Self {
        match &event.payload {
            EventPayload::UserJoin(join) => {
                self.users.insert(
                    join.user_id.clone(),
                    RoomUser {
                        display_name: join.display_name.clone(),
                        joined_at: event.timestamp,
                    },
                );
            }
            EventPayload::UserLeave(leave) => {
                self.users.remove(&leave.user_id);
            }
            EventPayload::RoomSettingsUpdate(update) => {
                for (key, value) in &update.settings {
                    self.settings.insert(key.clone(), value.clone());
                }
            }
            EventPayload::ChatMessage(chat) => {
                self.chat.push(ChatMessage {
                    user_id: chat.user_id.clone(),
                    display_name: chat.display_name.clone(),
                    message: chat.message.clone(),
                    timestamp: event.timestamp,
                });
            }
            _ => {}
        }

        self.last_seq = event.seq;
        self
    }
}

/// Folds a room stream's events into [`RoomState`]. Rooms have no
/// bootstrapping event analogous to `create`; an empty event list
/// yields `RoomState::default()`.
#[must_use]
pub fn project_room(snapshot: Option<RoomState>, events: &[PersistedEvent]) -> RoomState {
    events
        .iter()
        .fold(snapshot.unwrap_or_default(), RoomState::apply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CellFillPayload, CreatePayload, GameView};
    use crate::puzzle::PuzzleInfo;

    fn create_event(gid: &str, solution: Vec<Vec<&str>>, ts: i64) -> PersistedEvent {
        let solution: Vec<Vec<String>> = solution
            .into_iter()
            .map(|row| row.into_iter().map(str::to_owned).collect())
            .collect();

        let view = GameView {
            info: PuzzleInfo {
                title: "Test".into(),
                author: "Tester".into(),
                puzzle_type: "Daily".into(),
                copyright: None,
                description: None,
            },
            grid: solution
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|c| BlankCell { black: c.is_empty() })
                        .collect()
                })
                .collect(),
            solution,
            clues: Clues::default(),
            circles: vec![],
            shades: vec![],
        };

        PersistedEvent {
            stream_kind: StreamKind::Game,
            stream_id: gid.to_owned(),
            seq: 1,
            user_id: None,
            timestamp: ts,
            schema_version: 1,
            payload: EventPayload::Create(CreatePayload {
                pid: "p1".into(),
                view,
            }),
        }
    }

    fn fill_event(gid: &str, seq: Seq, row: i32, col: i32, value: &str) -> PersistedEvent {
        PersistedEvent {
            stream_kind: StreamKind::Game,
            stream_id: gid.to_owned(),
            seq,
            user_id: Some("u1".into()),
            timestamp: 1000 + seq,
            schema_version: 1,
            payload: EventPayload::CellFill(CellFillPayload {
                row,
                col,
                value: value.to_owned(),
                mode: FillMode::Ink,
                solved_by: None,
            }),
        }
    }

    #[test]
    fn create_then_fill_then_solve() {
        let solution = vec![
            vec!["A", "B", "C"],
            vec!["D", "E", "F"],
            vec!["G", "H", "I"],
        ];

        let mut events = vec![create_event("g1", solution.clone(), 1000)];
        let mut seq = 2;
        for (r, row) in solution.iter().enumerate() {
            for (c, letter) in row.iter().enumerate() {
                events.push(fill_event("g1", seq, r as i32, c as i32, letter));
                seq += 1;
            }
        }

        let state = project_game(None, &events).unwrap();

        assert!(!state.solved);
        assert_eq!(state.grid[0][0].value, "A");
        assert_eq!(state.grid[2][2].value, "I");
        assert_eq!(state.last_seq, seq - 1);
    }

    #[test]
    fn missing_create_event_is_an_error() {
        let events = vec![fill_event("g1", 1, 0, 0, "A")];
        assert!(matches!(
            project_game(None, &events),
            Err(ProjectionError::NoCreateEvent(_))
        ));
    }

    #[test]
    fn snapshot_equivalence() {
        let solution = vec![vec!["A", "B"], vec!["C", "D"]];
        let events = vec![
            create_event("g2", solution, 1000),
            fill_event("g2", 2, 0, 0, "A"),
            fill_event("g2", 3, 0, 1, "B"),
            fill_event("g2", 4, 1, 0, "C"),
        ];

        let full = project_game(None, &events).unwrap();

        let prefix_state = project_game(None, &events[..2]).unwrap();
        let suffix = &events[2..];
        let resumed = project_game(Some(prefix_state), suffix).unwrap();

        assert_eq!(full, resumed);
    }

    #[test]
    fn clock_state_machine_scenario() {
        let mut clock = ClockState::new(1000);
        clock.apply(ClockAction::Start, 1500, None);
        clock.apply(ClockAction::Pause, 2200, Some(700));
        clock.apply(ClockAction::Resume, 3000, None);

        assert_eq!(clock.phase, ClockPhase::Running);
        assert_eq!(clock.total_time_ms, 700);
    }

    #[test]
    fn redundant_clock_transitions_are_idempotent() {
        let mut clock = ClockState::new(0);
        clock.apply(ClockAction::Start, 100, None);
        clock.apply(ClockAction::Start, 200, None);
        assert_eq!(clock.phase, ClockPhase::Running);
        assert_eq!(clock.last_updated, 100);
    }
}
