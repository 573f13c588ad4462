//! The minimal HTTP surface: puzzle lookup/list, game
//! creation (which must emit a `create` event through the stream hub),
//! solve recording, and projected state fetch. Routing/formatting
//! beyond this is intentionally out of scope; these handlers exist so
//! the core is exercisable end to end, not as a production API.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Utc;
use gridsync_catalog::{PuzzleCatalog, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use gridsync_core::event::{CreatePayload, EventPayload, GameView, StreamKind};
use gridsync_core::projection::{project_game, GameState};
use gridsync_core::puzzle::{Puzzle, PuzzleListFilter, PuzzleListing, SolveRecord};
use gridsync_core::store::SeqRange;
use gridsync_core::{CoreError, EventStore};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn healthz(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .store
        .read(StreamKind::Room, "__healthz__", SeqRange::all())
        .await
        .map_err(CoreError::from)?;
    Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct ListPuzzlesQuery {
    #[serde(rename = "type")]
    types: Option<String>,
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn list_puzzles(
    State(state): State<AppState>,
    Query(query): Query<ListPuzzlesQuery>,
) -> Result<Json<Vec<PuzzleListing>>, ApiError> {
    let filter = PuzzleListFilter {
        types: query.types.map(|csv| csv.split(',').map(str::to_owned).collect()),
        search: query.search,
    };
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let puzzles = state.catalog.list_public(&filter, limit, offset).await?;
    Ok(Json(puzzles))
}

pub async fn get_puzzle(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> Result<Json<Puzzle>, ApiError> {
    let puzzle = state.catalog.find_by_pid(&pid).await?;
    Ok(Json(puzzle))
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pid: String,
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<Value>, ApiError> {
    let puzzle = state.catalog.find_by_pid(&request.pid).await?;
    let gid = uuid::Uuid::new_v4().to_string();

    let view = GameView {
        info: puzzle.content.info.clone(),
        grid: puzzle.content.blank_grid(),
        solution: puzzle.content.solution.clone(),
        clues: puzzle.content.clues.clone(),
        circles: puzzle.content.circles.clone(),
        shades: puzzle.content.shades.clone(),
    };

    let payload = EventPayload::Create(CreatePayload {
        pid: puzzle.pid.clone(),
        view,
    });

    state
        .hub
        .append_and_broadcast(
            StreamKind::Game,
            &gid,
            payload,
            None,
            Utc::now().timestamp_millis(),
            1,
        )
        .await
        .map_err(crate::error::ApiError::from)?;

    Ok(Json(json!({ "gid": gid })))
}

pub async fn get_game_state(
    State(state): State<AppState>,
    Path(gid): Path<String>,
) -> Result<Json<GameState>, ApiError> {
    let events = state
        .store
        .read(StreamKind::Game, &gid, SeqRange::all())
        .await
        .map_err(CoreError::from)?;

    let state = project_game(None, &events)
        .map_err(|_| CoreError::NotFound(gid))?;

    Ok(Json(state))
}

#[derive(Debug, Deserialize)]
pub struct RecordSolveRequest {
    time_to_solve_seconds: i64,
}

pub async fn record_solve(
    State(state): State<AppState>,
    Path(gid): Path<String>,
    Json(request): Json<RecordSolveRequest>,
) -> Result<Json<SolveRecord>, ApiError> {
    let record = state
        .solve_service
        .record_solve(&gid, request.time_to_solve_seconds)
        .await?;
    Ok(Json(record))
}
