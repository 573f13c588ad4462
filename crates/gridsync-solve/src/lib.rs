//! The solve service: derives a [`gridsync_core::puzzle::SolveRecord`]
//! from a solved game stream's full event history and records it
//! exactly once.

pub mod error;
pub mod repository;
mod service;

pub use error::SolveError;
pub use repository::{PostgresSolveRepository, SolveRepository};
pub use service::SolveService;
