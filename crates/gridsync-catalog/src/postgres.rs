use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridsync_core::puzzle::{Puzzle, PuzzleContent, PuzzleListFilter, PuzzleListing};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::CatalogError;
use crate::PuzzleCatalog;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn backend_unavailable(err: impl Into<anyhow::Error>) -> CatalogError {
    CatalogError::BackendUnavailable(err.into())
}

/// [`PuzzleCatalog`] backed by a single `puzzles` table.
#[derive(Clone)]
pub struct PostgresPuzzleCatalog {
    pool: PgPool,
}

impl PostgresPuzzleCatalog {
    pub async fn connect(database_url: &str) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend_unavailable)?;

        MIGRATOR.run(&pool).await.map_err(backend_unavailable)?;

        Ok(PostgresPuzzleCatalog { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        PostgresPuzzleCatalog { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PuzzleRow {
    id: i64,
    pid: String,
    pid_numeric: Option<i64>,
    is_public: bool,
    uploaded_at: DateTime<Utc>,
    times_solved: i64,
    content: serde_json::Value,
    created_by: Option<String>,
}

impl PuzzleRow {
    fn into_puzzle(self) -> Result<Puzzle, CatalogError> {
        let content: PuzzleContent =
            serde_json::from_value(self.content).map_err(backend_unavailable)?;

        Ok(Puzzle {
            id: self.id,
            pid: self.pid,
            pid_numeric: self.pid_numeric,
            is_public: self.is_public,
            uploaded_at: self.uploaded_at,
            times_solved: self.times_solved,
            content,
            created_by: self.created_by,
        })
    }
}

#[async_trait]
impl PuzzleCatalog for PostgresPuzzleCatalog {
    async fn find_by_pid(&self, pid: &str) -> Result<Puzzle, CatalogError> {
        let row: Option<PuzzleRow> = sqlx::query_as(
            r#"SELECT id, pid, pid_numeric, is_public, uploaded_at, times_solved, content, created_by
               FROM puzzles
               WHERE pid = $1"#,
        )
        .bind(pid)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_unavailable)?;

        row.ok_or_else(|| CatalogError::NotFound(pid.to_owned()))?
            .into_puzzle()
    }

    async fn increment_solve_count(&self, pid: &str) -> Result<(), CatalogError> {
        let result = sqlx::query("UPDATE puzzles SET times_solved = times_solved + 1 WHERE pid = $1")
            .bind(pid)
            .execute(&self.pool)
            .await
            .map_err(backend_unavailable)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(pid.to_owned()));
        }

        Ok(())
    }

    async fn list_public(
        &self,
        filter: &PuzzleListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PuzzleListing>, CatalogError> {
        let limit = limit.clamp(1, crate::MAX_PAGE_SIZE);
        let types = filter.types.clone();
        let patterns = search_patterns(filter);

        let rows: Vec<PuzzleRow> = sqlx::query_as(
            r#"SELECT id, pid, pid_numeric, is_public, uploaded_at, times_solved, content, created_by
               FROM puzzles
               WHERE is_public
                 AND ($1::text[] IS NULL OR content->'info'->>'type' = ANY($1))
                 AND ($2::text[] IS NULL OR lower(content->'info'->>'title' || ' ' || content->'info'->>'author') LIKE ALL($2) ESCAPE '\')
               ORDER BY pid_numeric DESC NULLS LAST
               LIMIT $3 OFFSET $4"#,
        )
        .bind(types)
        .bind(patterns)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_unavailable)?;

        rows.into_iter()
            .map(PuzzleRow::into_puzzle)
            .collect::<Result<Vec<_>, _>>()
            .map(|puzzles| {
                puzzles
                    .into_iter()
                    .map(|p| PuzzleListing {
                        pid: p.pid,
                        pid_numeric: p.pid_numeric,
                        info: p.content.info,
                        uploaded_at: p.uploaded_at,
                        times_solved: p.times_solved,
                    })
                    .collect()
            })
    }
}

/// `LIKE` patterns for each search token, with `%`, `_` and `\` escaped so
/// user input can't widen the match beyond a plain substring search.
fn search_patterns(filter: &PuzzleListFilter) -> Option<Vec<String>> {
    let tokens = filter.search_tokens();
    if tokens.is_empty() {
        return None;
    }
    Some(
        tokens
            .iter()
            .map(|token| {
                let escaped = token.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
                format!("%{escaped}%")
            })
            .collect(),
    )
}
