//! The minimal puzzle catalog surface: look a puzzle
//! up by its public id, bump its solve counter, and list the public
//! catalog with an optional type/search filter. Nothing here is
//! event-sourced; puzzles are plain rows, uploaded out of band.

pub mod error;
mod postgres;

#[cfg(feature = "testing")]
pub mod testing;

pub use error::CatalogError;
pub use postgres::PostgresPuzzleCatalog;

use async_trait::async_trait;
use gridsync_core::puzzle::{Puzzle, PuzzleListFilter, PuzzleListing};

/// Default and maximum page size for [`PuzzleCatalog::list_public`].
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// The catalog contract.
#[async_trait]
pub trait PuzzleCatalog: Send + Sync {
    /// Looks up a puzzle by its public id. `Err(NotFound)` if absent
    /// or not public.
    async fn find_by_pid(&self, pid: &str) -> Result<Puzzle, CatalogError>;

    /// Atomically increments a puzzle's solve counter. Idempotency of
    /// the *solve record itself* is the solve service's job; this
    /// call always increments, so callers must only invoke it once per
    /// newly-recorded solve.
    async fn increment_solve_count(&self, pid: &str) -> Result<(), CatalogError>;

    /// Lists public puzzles newest-first, filtered by `filter` and
    /// paginated by `(limit, offset)`. `limit` is clamped to
    /// [`MAX_PAGE_SIZE`].
    async fn list_public(
        &self,
        filter: &PuzzleListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PuzzleListing>, CatalogError>;
}
