//! The error taxonomy shared by every layer of the engine.
//!
//! Each crate defines its own narrower error enum for the failures
//! specific to its own I/O (a Postgres error, a Redis error, ...), but
//! converts into [`CoreError`] at the seam where the caller only cares
//! about the five categories below. This keeps `match`es at the
//! transport boundary (the realtime protocol, the HTTP surface) small
//! and stable even as backends change.

use thiserror::Error;

/// The closed error taxonomy for the collaboration engine.
///
/// Propagation policy: errors propagate to the immediate caller
/// unchanged. The realtime transport maps every variant except
/// [`CoreError::SubscriberBackpressure`] to an `error` frame without
/// closing the connection; a backpressure drop closes only the
/// offending subscriber.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed payload, missing required field, or an event type
    /// outside the closed taxonomy. No state change occurs.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested stream has no events, including a game stream
    /// missing its `create` event. Distinct from an empty-but-valid
    /// result.
    #[error("not found: {0}")]
    NotFound(String),

    /// A sequence-number race that survived every retry, or a unique
    /// index collision on a solve record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store or bus is unreachable. Not retried locally; surfaced
    /// to the caller.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] anyhow::Error),

    /// A subscriber's bounded outbound queue overflowed. Handled by
    /// dropping that one subscriber; never visible to other callers.
    #[error("subscriber backpressure: {0}")]
    SubscriberBackpressure(String),
}

impl CoreError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }

    #[must_use]
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, CoreError::BackendUnavailable(_))
    }
}
