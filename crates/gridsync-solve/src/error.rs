use gridsync_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("game {0} not found")]
    GameNotFound(String),

    #[error("game {0} has not been solved yet")]
    NotSolved(String),

    #[error("puzzle {0} not found")]
    PuzzleNotFound(String),

    #[error("time to solve must be greater than zero, got {0}")]
    InvalidTimeTaken(i64),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("solve backend unavailable: {0}")]
    BackendUnavailable(#[source] anyhow::Error),
}

impl From<SolveError> for CoreError {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::GameNotFound(id) | SolveError::NotSolved(id) | SolveError::PuzzleNotFound(id) => {
                CoreError::NotFound(id)
            }
            SolveError::InvalidTimeTaken(t) => {
                CoreError::Validation(format!("time to solve must be greater than zero, got {t}"))
            }
            SolveError::Core(e) => e,
            SolveError::BackendUnavailable(e) => CoreError::BackendUnavailable(e),
        }
    }
}
