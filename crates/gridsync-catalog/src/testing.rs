//! An in-memory [`PuzzleCatalog`], feature-gated behind `testing`, for
//! exercising `gridsync-solve` and `gridsync-server` without Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gridsync_core::puzzle::{Puzzle, PuzzleListFilter, PuzzleListing};

use crate::error::CatalogError;
use crate::PuzzleCatalog;

#[derive(Default)]
pub struct InMemoryPuzzleCatalog {
    puzzles: Mutex<HashMap<String, Puzzle>>,
}

impl InMemoryPuzzleCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, puzzle: Puzzle) {
        self.puzzles
            .lock()
            .expect("catalog mutex poisoned")
            .insert(puzzle.pid.clone(), puzzle);
    }
}

#[async_trait]
impl PuzzleCatalog for InMemoryPuzzleCatalog {
    async fn find_by_pid(&self, pid: &str) -> Result<Puzzle, CatalogError> {
        self.puzzles
            .lock()
            .expect("catalog mutex poisoned")
            .get(pid)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(pid.to_owned()))
    }

    async fn increment_solve_count(&self, pid: &str) -> Result<(), CatalogError> {
        let mut puzzles = self.puzzles.lock().expect("catalog mutex poisoned");
        let puzzle = puzzles
            .get_mut(pid)
            .ok_or_else(|| CatalogError::NotFound(pid.to_owned()))?;
        puzzle.times_solved += 1;
        Ok(())
    }

    async fn list_public(
        &self,
        filter: &PuzzleListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PuzzleListing>, CatalogError> {
        let tokens = filter.search_tokens();
        let puzzles = self.puzzles.lock().expect("catalog mutex poisoned");

        let mut matching: Vec<_> = puzzles
            .values()
            .filter(|p| p.is_public)
            .filter(|p| {
                filter
                    .types
                    .as_ref()
                    .map_or(true, |types| types.contains(&p.content.info.puzzle_type))
            })
            .filter(|p| {
                let haystack = format!("{} {}", p.content.info.title, p.content.info.author)
                    .to_lowercase();
                tokens.iter().all(|t| haystack.contains(t.as_str()))
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| match (a.pid_numeric, b.pid_numeric) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|p| PuzzleListing {
                pid: p.pid,
                pid_numeric: p.pid_numeric,
                info: p.content.info,
                uploaded_at: p.uploaded_at,
                times_solved: p.times_solved,
            })
            .collect())
    }
}
