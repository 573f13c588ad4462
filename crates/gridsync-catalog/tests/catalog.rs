#![cfg(feature = "testing")]

use chrono::Utc;
use gridsync_catalog::testing::InMemoryPuzzleCatalog;
use gridsync_catalog::{CatalogError, PuzzleCatalog};
use gridsync_core::puzzle::{Clues, Puzzle, PuzzleContent, PuzzleInfo, PuzzleListFilter};

fn sample_puzzle(pid: &str, title: &str, puzzle_type: &str) -> Puzzle {
    Puzzle {
        id: 1,
        pid: pid.to_owned(),
        pid_numeric: None,
        is_public: true,
        uploaded_at: Utc::now(),
        times_solved: 0,
        content: PuzzleContent {
            info: PuzzleInfo {
                title: title.to_owned(),
                author: "Ada".to_owned(),
                puzzle_type: puzzle_type.to_owned(),
                copyright: None,
                description: None,
            },
            solution: vec![vec!["A".into()]],
            clues: Clues::default(),
            circles: vec![],
            shades: vec![],
        },
        created_by: None,
    }
}

#[tokio::test]
async fn find_by_pid_returns_not_found_for_missing_puzzle() {
    let catalog = InMemoryPuzzleCatalog::new();
    let err = catalog.find_by_pid("missing").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn increment_solve_count_bumps_times_solved() {
    let catalog = InMemoryPuzzleCatalog::new();
    catalog.insert(sample_puzzle("p1", "Monday Mini", "Daily"));

    catalog.increment_solve_count("p1").await.unwrap();
    catalog.increment_solve_count("p1").await.unwrap();

    let puzzle = catalog.find_by_pid("p1").await.unwrap();
    assert_eq!(puzzle.times_solved, 2);
}

#[tokio::test]
async fn list_public_filters_by_type_and_search() {
    let catalog = InMemoryPuzzleCatalog::new();
    catalog.insert(sample_puzzle("p1", "Monday Mini", "Daily"));
    catalog.insert(sample_puzzle("p2", "Sunday Giant", "Weekly"));

    let daily_only = PuzzleListFilter {
        types: Some(vec!["Daily".into()]),
        search: None,
    };
    let listings = catalog.list_public(&daily_only, 10, 0).await.unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].pid, "p1");

    let search_mini = PuzzleListFilter {
        types: None,
        search: Some("mini".into()),
    };
    let listings = catalog.list_public(&search_mini, 10, 0).await.unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].pid, "p1");
}
