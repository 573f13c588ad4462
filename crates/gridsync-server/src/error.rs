//! Maps [`CoreError`] (and the few errors upstream of it) onto HTTP
//! status codes. This is the minimal mapping `gridsync-server` needs
//! to be runnable; a production status-code contract is out of scope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gridsync_catalog::CatalogError;
use gridsync_core::CoreError;
use gridsync_hub::HubError;
use gridsync_solve::SolveError;
use serde_json::json;

pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Core(core) => ApiError(core),
            HubError::ShuttingDown => {
                ApiError(CoreError::BackendUnavailable(anyhow::anyhow!("stream hub is shutting down")))
            }
        }
    }
}

impl From<SolveError> for ApiError {
    fn from(err: SolveError) -> Self {
        ApiError(err.into())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            CoreError::BackendUnavailable(err) => {
                tracing::error!(error = %err, "backend unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable".to_owned())
            }
            CoreError::SubscriberBackpressure(msg) => (StatusCode::OK, msg.clone()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
