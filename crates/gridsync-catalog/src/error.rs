use gridsync_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("puzzle not found: {0}")]
    NotFound(String),

    #[error("catalog backend unavailable: {0}")]
    BackendUnavailable(#[source] anyhow::Error),
}

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(pid) => CoreError::NotFound(pid),
            CatalogError::BackendUnavailable(e) => CoreError::BackendUnavailable(e),
        }
    }
}
