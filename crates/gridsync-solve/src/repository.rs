//! Where recorded solves live: a single `solve_records` row per
//! `(pid, gid)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridsync_core::puzzle::SolveRecord;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::SolveError;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn backend_unavailable(err: impl Into<anyhow::Error>) -> SolveError {
    SolveError::BackendUnavailable(err.into())
}

/// Where [`SolveRecord`]s are persisted. Insertion is idempotent on
/// `(pid, gid)`: a repeat call for an already-recorded solve returns
/// the original record rather than erroring or duplicating it.
#[async_trait]
pub trait SolveRepository: Send + Sync {
    /// Returns the record and `true` if this call created it, `false`
    /// if `(pid, gid)` already had one.
    async fn record_solve(
        &self,
        pid: &str,
        gid: &str,
        time_taken_seconds: i64,
        revealed_squares_count: i64,
        checked_squares_count: i64,
    ) -> Result<(SolveRecord, bool), SolveError>;
}

#[derive(Clone)]
pub struct PostgresSolveRepository {
    pool: PgPool,
}

impl PostgresSolveRepository {
    pub async fn connect(database_url: &str) -> Result<Self, SolveError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend_unavailable)?;

        MIGRATOR.run(&pool).await.map_err(backend_unavailable)?;

        Ok(PostgresSolveRepository { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        PostgresSolveRepository { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SolveRow {
    id: i64,
    pid: String,
    gid: String,
    solved_at: DateTime<Utc>,
    time_taken_seconds: i64,
    revealed_squares_count: i64,
    checked_squares_count: i64,
}

impl From<SolveRow> for SolveRecord {
    fn from(row: SolveRow) -> Self {
        SolveRecord {
            id: row.id,
            pid: row.pid,
            gid: row.gid,
            solved_at: row.solved_at,
            time_taken_seconds: row.time_taken_seconds,
            revealed_squares_count: row.revealed_squares_count,
            checked_squares_count: row.checked_squares_count,
        }
    }
}

#[async_trait]
impl SolveRepository for PostgresSolveRepository {
    /// Inserts the solve row and bumps `puzzles.times_solved` in one
    /// transaction, so the two can never diverge: a crash or error
    /// between them rolls both back rather than leaving a solve record
    /// with an un-bumped counter.
    async fn record_solve(
        &self,
        pid: &str,
        gid: &str,
        time_taken_seconds: i64,
        revealed_squares_count: i64,
        checked_squares_count: i64,
    ) -> Result<(SolveRecord, bool), SolveError> {
        let mut tx = self.pool.begin().await.map_err(backend_unavailable)?;

        let inserted: Option<SolveRow> = sqlx::query_as(
            r#"INSERT INTO solve_records
               (pid, gid, time_taken_seconds, revealed_squares_count, checked_squares_count)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (pid, gid) DO NOTHING
               RETURNING id, pid, gid, solved_at, time_taken_seconds, revealed_squares_count, checked_squares_count"#,
        )
        .bind(pid)
        .bind(gid)
        .bind(time_taken_seconds)
        .bind(revealed_squares_count)
        .bind(checked_squares_count)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_unavailable)?;

        let (record, is_new) = if let Some(row) = inserted {
            let result = sqlx::query("UPDATE puzzles SET times_solved = times_solved + 1 WHERE pid = $1")
                .bind(pid)
                .execute(&mut *tx)
                .await
                .map_err(backend_unavailable)?;

            if result.rows_affected() == 0 {
                return Err(SolveError::PuzzleNotFound(pid.to_owned()));
            }

            (SolveRecord::from(row), true)
        } else {
            let existing: SolveRow = sqlx::query_as(
                r#"SELECT id, pid, gid, solved_at, time_taken_seconds, revealed_squares_count, checked_squares_count
                   FROM solve_records
                   WHERE pid = $1 AND gid = $2"#,
            )
            .bind(pid)
            .bind(gid)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend_unavailable)?;

            (SolveRecord::from(existing), false)
        };

        tx.commit().await.map_err(backend_unavailable)?;

        Ok((record, is_new))
    }
}
