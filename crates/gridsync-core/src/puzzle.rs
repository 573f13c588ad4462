//! Puzzle and solve-record domain types. No I/O; the catalog/solve
//! crates own persistence of these shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about a puzzle, independent of its grid content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleInfo {
    pub title: String,
    pub author: String,
    #[serde(rename = "type")]
    pub puzzle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single clue: its number, direction, and text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub number: i32,
    pub text: String,
}

/// Across/down clue lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Clues {
    pub across: Vec<Clue>,
    pub down: Vec<Clue>,
}

/// The puzzle content blob: everything needed to derive a [`crate::event::GameView`]
/// on `create` and to check/reveal cells against the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleContent {
    pub info: PuzzleInfo,
    /// Ground truth. `""` marks a black cell.
    pub solution: Vec<Vec<String>>,
    pub clues: Clues,
    #[serde(default)]
    pub circles: Vec<crate::event::Cell>,
    #[serde(default)]
    pub shades: Vec<crate::event::Cell>,
}

impl PuzzleContent {
    /// Derives the blank grid clients see on `create`: black cells
    /// carried over from the solution, every other cell empty.
    #[must_use]
    pub fn blank_grid(&self) -> Vec<Vec<crate::event::BlankCell>> {
        self.solution
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| crate::event::BlankCell {
                        black: cell.is_empty(),
                    })
                    .collect()
            })
            .collect()
    }
}

/// A puzzle in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: i64,
    /// Public, unique identifier used in URLs and as the `create`
    /// event's source reference.
    pub pid: String,
    /// Numeric prefix of `pid`, if any, used for catalog ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_numeric: Option<i64>,
    pub is_public: bool,
    pub uploaded_at: DateTime<Utc>,
    pub times_solved: i64,
    pub content: PuzzleContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Filter accepted by `ListPublic`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PuzzleListFilter {
    /// Whitespace-tokenized, case-insensitive search terms, each of
    /// which must match as a substring of `title || ' ' || author`.
    #[must_use]
    pub fn search_tokens(&self) -> Vec<String> {
        self.search
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }
}

/// A row in the public puzzle listing — a trimmed-down [`Puzzle`]
/// projection, not the full content blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleListing {
    pub pid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_numeric: Option<i64>,
    pub info: PuzzleInfo,
    pub uploaded_at: DateTime<Utc>,
    pub times_solved: i64,
}

/// A recorded solve of `(pid, gid)`. Insert-only; unique per
/// `(pid, gid)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRecord {
    pub id: i64,
    pub pid: String,
    pub gid: String,
    pub solved_at: DateTime<Utc>,
    pub time_taken_seconds: i64,
    pub revealed_squares_count: i64,
    pub checked_squares_count: i64,
}
