use gridsync_core::CoreError;

/// Errors the hub itself can raise, on top of whatever the store or
/// bus already report through [`CoreError`].
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("stream hub is shutting down")]
    ShuttingDown,
}

impl From<crate::bus::BusError> for HubError {
    fn from(err: crate::bus::BusError) -> Self {
        HubError::Core(CoreError::BackendUnavailable(err.into()))
    }
}
