//! [`SolveService`]: the solve service's one operation, `RecordSolve`.

use std::collections::HashSet;
use std::sync::Arc;

use gridsync_core::event::{EventPayload, StreamKind};
use gridsync_core::projection::project_game;
use gridsync_core::puzzle::SolveRecord;
use gridsync_core::store::{EventStore, SeqRange};
use gridsync_core::CoreError;

use crate::error::SolveError;
use crate::repository::SolveRepository;

/// Derives a solve record from a solved game's full event history and
/// records it exactly once, incrementing the source puzzle's solve
/// count only the first time. The puzzle's counter is bumped by the
/// repository itself, in the same transaction as the solve-record
/// insert, so the two can never drift apart.
pub struct SolveService<S> {
    store: Arc<S>,
    repository: Arc<dyn SolveRepository>,
}

impl<S> SolveService<S>
where
    S: EventStore,
{
    pub fn new(store: Arc<S>, repository: Arc<dyn SolveRepository>) -> Self {
        SolveService { store, repository }
    }

    #[tracing::instrument(skip(self), fields(gid))]
    pub async fn record_solve(
        &self,
        gid: &str,
        time_to_solve_seconds: i64,
    ) -> Result<SolveRecord, SolveError> {
        if time_to_solve_seconds <= 0 {
            return Err(SolveError::InvalidTimeTaken(time_to_solve_seconds));
        }

        let events = self
            .store
            .read(StreamKind::Game, gid, SeqRange::all())
            .await
            .map_err(CoreError::from)?;

        let state = project_game(None, &events).map_err(|_| SolveError::GameNotFound(gid.to_owned()))?;

        if !state.solved {
            return Err(SolveError::NotSolved(gid.to_owned()));
        }

        let mut revealed = HashSet::new();
        let mut checked = HashSet::new();
        for event in &events {
            match &event.payload {
                EventPayload::CellReveal(scope) => revealed.extend(scope.affected_cells()),
                EventPayload::CellCheck(scope) => checked.extend(scope.affected_cells()),
                _ => {}
            }
        }

        let (record, is_new) = self
            .repository
            .record_solve(
                &state.pid,
                gid,
                time_to_solve_seconds,
                revealed.len() as i64,
                checked.len() as i64,
            )
            .await?;

        if is_new {
            tracing::info!(pid = %state.pid, gid, "recorded new solve");
        }

        Ok(record)
    }
}
