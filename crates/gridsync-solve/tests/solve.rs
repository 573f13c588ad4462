use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gridsync_catalog::testing::InMemoryPuzzleCatalog;
use gridsync_catalog::PuzzleCatalog;
use gridsync_core::event::{
    BlankCell, CellFillPayload, CellScopePayload, ClockAction, ClockUpdatePayload, CreatePayload,
    EventPayload, FillMode, GameView, PuzzleSolvedPayload, StreamKind,
};
use gridsync_core::puzzle::{Clues, Puzzle, PuzzleContent, PuzzleInfo, SolveRecord};
use gridsync_core::testing::InMemoryEventStore;
use gridsync_core::EventStore;
use gridsync_solve::{SolveError, SolveRepository, SolveService};

/// Stands in for [`gridsync_solve::repository::PostgresSolveRepository`]'s
/// transaction: bumps the catalog counter itself when it inserts a new
/// record, so the "exactly once" guarantee holds without a real database.
struct InMemorySolveRepository {
    records: Mutex<HashMap<(String, String), SolveRecord>>,
    next_id: Mutex<i64>,
    catalog: Arc<InMemoryPuzzleCatalog>,
}

impl InMemorySolveRepository {
    fn new(catalog: Arc<InMemoryPuzzleCatalog>) -> Self {
        InMemorySolveRepository {
            records: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
            catalog,
        }
    }
}

#[async_trait]
impl SolveRepository for InMemorySolveRepository {
    async fn record_solve(
        &self,
        pid: &str,
        gid: &str,
        time_taken_seconds: i64,
        revealed_squares_count: i64,
        checked_squares_count: i64,
    ) -> Result<(SolveRecord, bool), SolveError> {
        let key = (pid.to_owned(), gid.to_owned());
        if let Some(existing) = self.records.lock().unwrap().get(&key) {
            return Ok((existing.clone(), false));
        }

        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            *next_id
        };

        let record = SolveRecord {
            id,
            pid: pid.to_owned(),
            gid: gid.to_owned(),
            solved_at: Utc::now(),
            time_taken_seconds,
            revealed_squares_count,
            checked_squares_count,
        };
        self.records.lock().unwrap().insert(key, record.clone());
        self.catalog.increment_solve_count(pid).await.unwrap();
        Ok((record, true))
    }
}

fn puzzle_info() -> PuzzleInfo {
    PuzzleInfo {
        title: "Test".into(),
        author: "Ada".into(),
        puzzle_type: "Daily".into(),
        copyright: None,
        description: None,
    }
}

fn blank_puzzle(pid: &str) -> Puzzle {
    Puzzle {
        id: 1,
        pid: pid.to_owned(),
        pid_numeric: None,
        is_public: true,
        uploaded_at: Utc::now(),
        times_solved: 0,
        content: PuzzleContent {
            info: puzzle_info(),
            solution: vec![vec!["A".into(), "B".into()]],
            clues: Clues::default(),
            circles: vec![],
            shades: vec![],
        },
        created_by: None,
    }
}

fn create_event() -> EventPayload {
    EventPayload::Create(CreatePayload {
        pid: "p1".into(),
        view: GameView {
            info: puzzle_info(),
            grid: vec![vec![
                BlankCell { black: false },
                BlankCell { black: false },
            ]],
            solution: vec![vec!["A".into(), "B".into()]],
            clues: Clues::default(),
            circles: vec![],
            shades: vec![],
        },
    })
}

async fn build_solved_game(store: &InMemoryEventStore, gid: &str) {
    store
        .append(StreamKind::Game, gid, create_event(), None, 0, 1)
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            gid,
            EventPayload::CellFill(CellFillPayload {
                row: 0,
                col: 0,
                value: "A".into(),
                mode: FillMode::Ink,
                solved_by: None,
            }),
            Some("u1".into()),
            10,
            1,
        )
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            gid,
            EventPayload::CellCheck(CellScopePayload {
                row: 0,
                col: 0,
                scope: None,
            }),
            Some("u1".into()),
            11,
            1,
        )
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            gid,
            EventPayload::ClockUpdate(ClockUpdatePayload {
                action: ClockAction::Start,
                total_time_ms: None,
            }),
            None,
            1,
            1,
        )
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            gid,
            EventPayload::PuzzleSolved(PuzzleSolvedPayload {
                solved_at: 20,
                total_time_ms: Some(20_000),
            }),
            None,
            20,
            1,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn recording_a_solve_increments_the_catalog_exactly_once() {
    let store = Arc::new(InMemoryEventStore::new());
    let catalog = Arc::new(InMemoryPuzzleCatalog::new());
    catalog.insert(blank_puzzle("p1"));
    let repository = Arc::new(InMemorySolveRepository::new(catalog.clone()));

    build_solved_game(&store, "g1").await;

    let service = SolveService::new(store.clone(), repository.clone());

    let first = service.record_solve("g1", 20).await.unwrap();
    assert_eq!(first.time_taken_seconds, 20);
    assert_eq!(first.checked_squares_count, 1);

    let second = service.record_solve("g1", 20).await.unwrap();
    assert_eq!(second.id, first.id);

    let puzzle = catalog.find_by_pid("p1").await.unwrap();
    assert_eq!(puzzle.times_solved, 1);
}

#[tokio::test]
async fn recording_an_unsolved_game_is_an_error() {
    let store = Arc::new(InMemoryEventStore::new());
    let catalog = Arc::new(InMemoryPuzzleCatalog::new());
    let repository = Arc::new(InMemorySolveRepository::new(catalog));

    store
        .append(StreamKind::Game, "g2", create_event(), None, 0, 1)
        .await
        .unwrap();

    let service = SolveService::new(store, repository);
    let err = service.record_solve("g2", 20).await.unwrap_err();
    assert!(matches!(err, SolveError::NotSolved(_)));
}

#[tokio::test]
async fn distinct_cells_are_counted_once_despite_overlapping_scopes() {
    let store = Arc::new(InMemoryEventStore::new());
    let catalog = Arc::new(InMemoryPuzzleCatalog::new());
    catalog.insert(blank_puzzle("p1"));
    let repository = Arc::new(InMemorySolveRepository::new(catalog));

    store
        .append(StreamKind::Game, "g3", create_event(), None, 0, 1)
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            "g3",
            EventPayload::CellReveal(CellScopePayload {
                row: 0,
                col: 0,
                scope: Some(vec![
                    gridsync_core::event::Cell { row: 0, col: 0 },
                    gridsync_core::event::Cell { row: 0, col: 1 },
                ]),
            }),
            None,
            5,
            1,
        )
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            "g3",
            EventPayload::CellReveal(CellScopePayload {
                row: 0,
                col: 1,
                scope: None,
            }),
            None,
            6,
            1,
        )
        .await
        .unwrap();
    store
        .append(
            StreamKind::Game,
            "g3",
            EventPayload::PuzzleSolved(PuzzleSolvedPayload {
                solved_at: 30,
                total_time_ms: Some(30_000),
            }),
            None,
            30,
            1,
        )
        .await
        .unwrap();

    let service = SolveService::new(store, repository);
    let record = service.record_solve("g3", 30).await.unwrap();
    assert_eq!(record.revealed_squares_count, 2);
    assert_eq!(record.checked_squares_count, 0);
}
